//! In-process fake of the shop API for unit tests.
//!
//! Keeps just enough server state (cart rows, addresses, coupons) that a
//! re-fetch after a mutation observes the mutation, and records every call
//! so tests can assert on the exact request sequence.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use shop_core::{
    Address, AddressAction, AddressId, CouponCode, NewAddress, Price, ProductId,
};

use crate::api::{
    Ack, ActiveOrder, ApiError, CHECKOUT_SUCCESS, CONFIRM_SUCCESS, CartContents, CartItem,
    CheckoutResponse, ConfirmOrderResponse, CouponCheck, OrderHistoryEntry, OrderLine,
    OrderSummary, ShopApi,
};

/// One recorded API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Cart,
    CartCount,
    AddToCart(ProductId),
    UpdateCart(ProductId, u32),
    RemoveFromCart(ProductId),
    Checkout,
    ActiveOrder,
    ConfirmOrder(Option<String>),
    CheckCoupon(String),
    Addresses,
    CreateAddress(NewAddress),
    AddressAction(AddressId, AddressAction),
    Orders,
}

/// How a failing endpoint fails.
#[derive(Debug, Clone, Copy)]
enum Failure {
    /// The server answers 503.
    Rejected,
    /// The request never leaves the client.
    Unreachable,
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<Call>,
    catalog: BTreeMap<ProductId, (String, Price)>,
    cart: BTreeMap<ProductId, u32>,
    active_order: Option<OrderSummary>,
    coupons: BTreeMap<String, Price>,
    addresses: Vec<Address>,
    orders: Vec<OrderHistoryEntry>,
    failing: BTreeMap<&'static str, Failure>,
    checkout_rejection: Option<String>,
}

/// Recording fake of [`ShopApi`].
#[derive(Debug, Default)]
pub struct FakeShop {
    state: Mutex<FakeState>,
}

impl FakeShop {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a product the cart endpoints will accept.
    pub fn with_product(self, id: i32, name: &str, price: Price) -> Self {
        self.lock()
            .catalog
            .insert(ProductId::new(id), (name.to_string(), price));
        self
    }

    /// Put `quantity` of a registered product in the server cart.
    pub fn with_cart_line(self, id: i32, quantity: u32) -> Self {
        self.lock().cart.insert(ProductId::new(id), quantity);
        self
    }

    pub fn with_coupon(self, code: &str, discount: Price) -> Self {
        self.lock().coupons.insert(code.to_string(), discount);
        self
    }

    pub fn with_address(self, id: i32, is_active: bool) -> Self {
        self.lock().addresses.push(Address {
            id: AddressId::new(id),
            country: "NL".to_string(),
            city: "Utrecht".to_string(),
            address: format!("Street {id}"),
            zipcode: "3511".to_string(),
            is_active,
        });
        self
    }

    pub fn with_active_order(self, summary: OrderSummary) -> Self {
        self.lock().active_order = Some(summary);
        self
    }

    pub fn with_order(self, entry: OrderHistoryEntry) -> Self {
        self.lock().orders.push(entry);
        self
    }

    /// Make checkout answer with `message` instead of creating an order.
    pub fn rejecting_checkout(self, message: &str) -> Self {
        self.lock().checkout_rejection = Some(message.to_string());
        self
    }

    /// Make every call to `endpoint` fail with a 503.
    pub fn failing(&self, endpoint: &'static str) {
        self.lock().failing.insert(endpoint, Failure::Rejected);
    }

    /// Make every call to `endpoint` fail before it is sent, the way a
    /// request without a `csrftoken` cookie does.
    pub fn unreachable(&self, endpoint: &'static str) {
        self.lock().failing.insert(endpoint, Failure::Unreachable);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn server_quantity(&self, id: i32) -> Option<u32> {
        self.lock().cart.get(&ProductId::new(id)).copied()
    }

    pub fn addresses_snapshot(&self) -> Vec<Address> {
        self.lock().addresses.clone()
    }

    fn record(&self, endpoint: &'static str, call: Call) -> Result<MutexGuard<'_, FakeState>, ApiError> {
        let mut state = self.lock();
        state.calls.push(call);
        let failure = state.failing.get(endpoint).copied();
        match failure {
            Some(Failure::Rejected) => Err(ApiError::Status {
                status: 503,
                body: format!("{endpoint} unavailable"),
            }),
            Some(Failure::Unreachable) => Err(ApiError::MissingCsrfToken),
            None => Ok(state),
        }
    }
}

fn contents(state: &FakeState) -> CartContents {
    let cart_items: Vec<CartItem> = state
        .cart
        .iter()
        .filter_map(|(id, quantity)| {
            let (name, price) = state.catalog.get(id)?;
            Some(CartItem {
                id: *id,
                name: name.clone(),
                description: format!("About {name}"),
                price: *price,
                quantity: *quantity,
            })
        })
        .collect();
    let total_price = cart_items.iter().map(|item| item.price.times(item.quantity)).sum();
    CartContents {
        cart_items,
        total_price,
    }
}

fn ack(message: &str) -> Ack {
    Ack {
        message: Some(message.to_string()),
    }
}

#[async_trait]
impl ShopApi for FakeShop {
    async fn cart(&self) -> Result<CartContents, ApiError> {
        let state = self.record("cart", Call::Cart)?;
        Ok(contents(&state))
    }

    async fn cart_count(&self) -> Result<u32, ApiError> {
        let state = self.record("cart_count", Call::CartCount)?;
        Ok(state.cart.values().sum())
    }

    async fn add_to_cart(&self, product_id: ProductId) -> Result<Ack, ApiError> {
        let mut state = self.record("add_to_cart", Call::AddToCart(product_id))?;
        *state.cart.entry(product_id).or_insert(0) += 1;
        Ok(ack("Product added to cart"))
    }

    async fn update_cart(&self, product_id: ProductId, quantity: u32) -> Result<Ack, ApiError> {
        let mut state = self.record("update_cart", Call::UpdateCart(product_id, quantity))?;
        if quantity < 1 {
            state.cart.remove(&product_id);
        } else {
            state.cart.insert(product_id, quantity);
        }
        Ok(ack("Cart updated successfully"))
    }

    async fn remove_from_cart(&self, product_id: ProductId) -> Result<Ack, ApiError> {
        let mut state = self.record("remove_from_cart", Call::RemoveFromCart(product_id))?;
        state.cart.remove(&product_id);
        Ok(ack("Item removed from cart successfully"))
    }

    async fn checkout(&self) -> Result<CheckoutResponse, ApiError> {
        let mut state = self.record("checkout", Call::Checkout)?;
        if let Some(message) = state.checkout_rejection.clone() {
            return Ok(CheckoutResponse {
                message,
                order_id: None,
                order_items: vec![],
                total_price: None,
            });
        }
        if state.cart.is_empty() {
            return Ok(CheckoutResponse {
                message: "Your cart is empty".to_string(),
                order_id: None,
                order_items: vec![],
                total_price: None,
            });
        }

        let cart = contents(&state);
        let summary = OrderSummary {
            order_items: cart
                .cart_items
                .iter()
                .map(|item| OrderLine {
                    name: item.name.clone(),
                    quantity: item.quantity,
                    price: item.price.times(item.quantity),
                })
                .collect(),
            total_price: cart.total_price,
        };
        state.cart.clear();
        state.active_order = Some(summary.clone());

        Ok(CheckoutResponse {
            message: CHECKOUT_SUCCESS.to_string(),
            order_id: Some(shop_core::OrderId::new(1)),
            order_items: summary.order_items,
            total_price: Some(summary.total_price),
        })
    }

    async fn active_order(&self) -> Result<ActiveOrder, ApiError> {
        let state = self.record("active_order", Call::ActiveOrder)?;
        Ok(state.active_order.clone().map_or_else(
            || ActiveOrder::Missing {
                error: "No active order found".to_string(),
            },
            ActiveOrder::Found,
        ))
    }

    async fn confirm_order(
        &self,
        coupon: Option<&CouponCode>,
    ) -> Result<ConfirmOrderResponse, ApiError> {
        let mut state = self.record(
            "confirm_order",
            Call::ConfirmOrder(coupon.map(|c| c.as_str().to_string())),
        )?;
        if state.active_order.is_none() {
            return Ok(ConfirmOrderResponse {
                message: "No active order found".to_string(),
                cart_id: None,
            });
        }
        if !state.addresses.iter().any(|a| a.is_active) {
            return Ok(ConfirmOrderResponse {
                message: "You must have an active address to confirm the order.".to_string(),
                cart_id: None,
            });
        }
        state.active_order = None;
        Ok(ConfirmOrderResponse {
            message: CONFIRM_SUCCESS.to_string(),
            cart_id: Some(shop_core::CartId::new(1)),
        })
    }

    async fn check_coupon(&self, code: &CouponCode) -> Result<CouponCheck, ApiError> {
        let state = self.record("check_coupon", Call::CheckCoupon(code.as_str().to_string()))?;
        Ok(state
            .coupons
            .get(code.as_str())
            .map_or(CouponCheck::INVALID, |discount| CouponCheck {
                valid: true,
                discount: Some(*discount),
            }))
    }

    async fn addresses(&self) -> Result<Vec<Address>, ApiError> {
        let state = self.record("addresses", Call::Addresses)?;
        Ok(state.addresses.clone())
    }

    async fn create_address(&self, address: &NewAddress) -> Result<(), ApiError> {
        let mut state = self.record("create_address", Call::CreateAddress(address.clone()))?;
        let next_id = state
            .addresses
            .iter()
            .map(|a| a.id.as_i32())
            .max()
            .unwrap_or(0)
            + 1;
        state.addresses.push(Address {
            id: AddressId::new(next_id),
            country: address.country.clone(),
            city: address.city.clone(),
            address: address.address.clone(),
            zipcode: address.zipcode.clone(),
            is_active: false,
        });
        Ok(())
    }

    async fn address_action(&self, id: AddressId, action: AddressAction) -> Result<(), ApiError> {
        let mut state = self.record("address_action", Call::AddressAction(id, action))?;
        if !state.addresses.iter().any(|a| a.id == id) {
            return Err(ApiError::Status {
                status: 404,
                body: "Not found.".to_string(),
            });
        }
        match action {
            // The server keeps at most one address active
            AddressAction::Activate => {
                for address in &mut state.addresses {
                    address.is_active = address.id == id;
                }
            }
            AddressAction::Deactivate => {
                for address in state.addresses.iter_mut().filter(|a| a.id == id) {
                    address.is_active = false;
                }
            }
            AddressAction::Delete => state.addresses.retain(|a| a.id != id),
        }
        Ok(())
    }

    async fn orders(&self) -> Result<Vec<OrderHistoryEntry>, ApiError> {
        let state = self.record("orders", Call::Orders)?;
        Ok(state.orders.clone())
    }
}
