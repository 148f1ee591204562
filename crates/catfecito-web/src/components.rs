//! UI Components

use leptos::prelude::*;

/// Path of the banner artwork served with the static assets
pub const BANNER_IMAGE: &str = "/assets/img/coffeebanner.png";

/// Promotional banner shown above the catalog
#[component]
pub fn ProductBanner() -> impl IntoView {
    view! {
        <div class="coffee-banner">
            <div class="banner-image">
                <img src=BANNER_IMAGE alt="Granos de café" />
            </div>
        </div>
    }
}

/// Colored badge for a payment status
#[component]
pub fn PaymentBadge(status: String) -> impl IntoView {
    let label = match status.as_str() {
        "approved" => "Pagado",
        "rejected" => "Rechazado",
        _ => "Pendiente",
    };
    let class = format!("badge badge-{status}");

    view! { <span class=class>{label}</span> }
}
