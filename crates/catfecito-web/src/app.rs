//! Main App Component

use leptos::prelude::*;
use leptos_router::{components::*, path};

use crate::pages::{OrderPaymentPage, ProductsPage};

/// Root application component
#[component]
pub fn App() -> impl IntoView {
    view! {
        <Router>
            <main class="app">
                <Routes fallback=|| view! { <p>"Página no encontrada"</p> }>
                    <Route path=path!("/") view=ProductsPage />
                    <Route path=path!("/orders/:id/pay") view=OrderPaymentPage />
                </Routes>
            </main>
        </Router>
    }
}
