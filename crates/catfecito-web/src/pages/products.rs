//! Products Page

use leptos::prelude::*;

use crate::components::ProductBanner;

#[component]
pub fn ProductsPage() -> impl IntoView {
    view! {
        <div class="products">
            <ProductBanner />
            <h1>"Nuestros cafés"</h1>
            <p class="subtitle">"Granos de especialidad, tostados cada semana"</p>
        </div>
    }
}
