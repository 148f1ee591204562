//! Order Payment Page

use leptos::prelude::*;
use leptos_router::hooks::use_params_map;

use crate::api::{self, OrderPayment};
use crate::components::PaymentBadge;

#[component]
pub fn OrderPaymentPage() -> impl IntoView {
    let params = use_params_map();
    let order_id = params
        .with_untracked(|p| p.get("id"))
        .and_then(|id| id.parse::<i32>().ok());

    let (order, set_order) = signal(None::<OrderPayment>);
    let (error, set_error) = signal(None::<String>);
    let (paying, set_paying) = signal(false);

    match order_id {
        Some(id) => leptos::task::spawn_local(async move {
            match api::payment_status(id).await {
                Ok(found) => set_order.set(Some(found)),
                Err(e) => set_error.set(Some(e)),
            }
        }),
        None => set_error.set(Some("Pedido inválido".into())),
    }

    let pay = move |_| {
        let Some(id) = order_id else { return };
        if paying.get() {
            return;
        }
        set_paying.set(true);
        set_error.set(None);

        leptos::task::spawn_local(async move {
            match api::create_preference(id).await {
                Ok(created) => match created.redirect_url() {
                    Some(url) => {
                        if let Some(window) = web_sys::window() {
                            let _ = window.location().set_href(url);
                        }
                    }
                    None => {
                        set_error.set(Some(format!(
                            "La preferencia {} no tiene link de pago",
                            created.preference_id
                        )));
                        set_paying.set(false);
                    }
                },
                Err(e) => {
                    set_error.set(Some(e));
                    set_paying.set(false);
                }
            }
        });
    };

    view! {
        <div class="order-payment">
            <h1>"Pagar pedido"</h1>

            {move || order.get().map(|o| {
                let payable = o.payment_status != "approved";
                view! {
                    <section class="order-summary">
                        <h2>{format!("Pedido #{}", o.id)}</h2>
                        <p class="total">{format!("Total: ${}", o.total)}</p>
                        <p class="status">"Estado: " {o.status.clone()}</p>
                        <p class="payment">
                            "Pago: " <PaymentBadge status=o.payment_status.clone() />
                        </p>
                        {o.payment_id.clone().map(|id| view! {
                            <p class="reference">"Referencia: " {id}</p>
                        })}
                        <p class="updated">
                            {format!("Actualizado: {}", o.updated_at.format("%d/%m/%Y %H:%M"))}
                        </p>
                        <Show when=move || payable>
                            <button
                                class="btn btn-primary"
                                on:click=pay
                                disabled=move || paying.get()
                            >
                                {move || if paying.get() { "Redirigiendo..." } else { "Pagar con Mercado Pago" }}
                            </button>
                        </Show>
                    </section>
                }
            })}

            {move || error.get().map(|e| view! { <p class="error">{e}</p> })}
        </div>
    }
}
