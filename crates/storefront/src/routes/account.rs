//! Account route handlers.
//!
//! Both routes answer anonymous visitors with a sign-in prompt rather than a
//! redirect; the profile page decides how to render it.

use axum::{Json, extract::State};
use serde::Serialize;
use tower_sessions::Session;

use modern_shop_core::{EnrichedOrder, OrderFailure, OrderHistory};

use crate::error::{Result, add_breadcrumb, set_sentry_user};
use crate::middleware::OptionalCustomer;
use crate::models::CurrentCustomer;
use crate::state::AppState;

/// Prompt shown to visitors who are not signed in.
pub const SIGN_IN_PROMPT: &str = "You are supposed to sign in first";

/// Order history as returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OrderHistoryBody {
    /// No signed-in customer.
    Anonymous { message: &'static str },
    /// Every order, newest first.
    Ok { orders: Vec<EnrichedOrder> },
    /// Orders that loaded, plus the ones that did not.
    Partial {
        orders: Vec<EnrichedOrder>,
        unavailable: Vec<OrderFailure>,
    },
}

impl From<OrderHistory> for OrderHistoryBody {
    fn from(history: OrderHistory) -> Self {
        match history {
            OrderHistory::Anonymous => Self::Anonymous {
                message: SIGN_IN_PROMPT,
            },
            OrderHistory::History { orders } => Self::Ok { orders },
            OrderHistory::PartialFailure { orders, failures } => Self::Partial {
                orders,
                unavailable: failures,
            },
        }
    }
}

/// Profile page data.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: Option<CurrentCustomer>,
    pub order_history: OrderHistoryBody,
}

/// Display the signed-in customer and their order history.
pub async fn profile(
    State(state): State<AppState>,
    OptionalCustomer(customer): OptionalCustomer,
    session: Session,
) -> Result<Json<ProfileResponse>> {
    if let Some(customer) = &customer {
        set_sentry_user(&customer.email);
    }

    let order_history = load_history(&state, &session).await?;

    Ok(Json(ProfileResponse {
        user: customer,
        order_history,
    }))
}

/// Order history only.
pub async fn orders(
    State(state): State<AppState>,
    OptionalCustomer(customer): OptionalCustomer,
    session: Session,
) -> Result<Json<OrderHistoryBody>> {
    if let Some(customer) = &customer {
        set_sentry_user(&customer.email);
    }

    Ok(Json(load_history(&state, &session).await?))
}

async fn load_history(state: &AppState, session: &Session) -> Result<OrderHistoryBody> {
    let history = state.orders().get_order_history(session).await?;

    if !history.is_anonymous() {
        let orders = history.orders().len().to_string();
        let unavailable = history.failures().len().to_string();
        add_breadcrumb(
            "orders",
            "Viewed order history",
            Some(&[("orders", orders.as_str()), ("unavailable", unavailable.as_str())]),
        );
    }

    Ok(history.into())
}
