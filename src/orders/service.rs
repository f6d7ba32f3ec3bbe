use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::auth::{AuthenticatedUser, Role};
use crate::cart::service::{add_line, load_view, pin_cart, price_cart};
use crate::cart::{CartRepository, NewCartLine, MAX_LINE_QUANTITY};
use crate::catalog::{CatalogRepository, CatalogSnapshot, Restaurant, RestaurantRepository};
use crate::coupons::CouponValidator;
use crate::db::{is_unique_violation, ORDER_IDEMPOTENCY_INDEX};
use crate::notifications::NotificationMessage;
use crate::orders::{
    ConfirmPaymentRequest, CreateOrderRequest, NewOrder, NewOrderLine, Order, OrderError,
    OrderItemsRepository, OrderLine, OrderResponse, OrderStatus, OrdersRepository,
    PaymentStatus, PriceCalculator, ReorderSummary, ReorderedLine, SkippedLine, StatusMachine,
    UpdateStatusRequest,
};
use crate::outbox::{OutboxHandle, OutboxRepository, SideEffect};
use crate::pricing::{AddOnSnapshot, PricedLine, UnavailableReason};
use crate::wallet::WalletLedger;

/// Result of a checkout: the order plus whether this call created it
#[derive(Debug, Clone)]
pub struct CreateOrderOutcome {
    pub order: OrderResponse,
    /// `false` when an idempotent retry returned an order placed earlier
    pub created: bool,
}

/// Service for order business logic
///
/// Every multi-step operation runs in one database transaction; post-commit
/// side effects go through the outbox and the worker is woken after commit.
#[derive(Clone)]
pub struct OrderService {
    pool: PgPool,
    outbox: OutboxHandle,
}

impl OrderService {
    pub fn new(pool: PgPool, outbox: OutboxHandle) -> Self {
        Self { pool, outbox }
    }

    /// Turn the caller's cart into an order
    ///
    /// # Steps
    /// 1. Return the existing order if the idempotency key was already used
    /// 2. Lock the cart row and load its lines
    /// 3. Check the restaurant is active and open
    /// 4. Re-price every line against the live catalog; all lines must be
    ///    available and the subtotal must meet the restaurant minimum
    /// 5. Lock and validate the coupon, if any
    /// 6. Lock the wallet when paying from it and settle the totals
    /// 7. Insert the order and its line snapshots
    /// 8. Debit the wallet, queue the coupon redemption and notifications,
    ///    delete the cart, commit
    /// 9. Wake the outbox worker
    #[tracing::instrument(skip(self, request), fields(use_wallet = request.use_wallet))]
    pub async fn create_order(
        &self,
        user_id: i32,
        request: CreateOrderRequest,
    ) -> Result<CreateOrderOutcome, OrderError> {
        let key = request
            .idempotency_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string);

        if let Some(key) = key.as_deref() {
            let mut conn = self.pool.acquire().await?;
            if let Some(existing) = find_by_key(&mut conn, user_id, key).await? {
                tracing::info!(
                    "Idempotent retry for user {} returned order {}",
                    user_id,
                    existing.order.id
                );
                return Ok(CreateOrderOutcome {
                    order: existing,
                    created: false,
                });
            }
        }

        match self.place_order(user_id, &request, key.as_deref()).await {
            Ok(outcome) => {
                if outcome.created {
                    self.outbox.wake();
                }
                Ok(outcome)
            }
            Err(OrderError::Database(e)) => match key.as_deref() {
                // A concurrent request with the same key committed first
                Some(key) if is_unique_violation(&e, ORDER_IDEMPOTENCY_INDEX) => {
                    let mut conn = self.pool.acquire().await?;
                    match find_by_key(&mut conn, user_id, key).await? {
                        Some(existing) => {
                            tracing::info!(
                                "Idempotency key collision for user {} resolved to order {}",
                                user_id,
                                existing.order.id
                            );
                            Ok(CreateOrderOutcome {
                                order: existing,
                                created: false,
                            })
                        }
                        None => Err(OrderError::Database(e)),
                    }
                }
                _ => Err(OrderError::Database(e)),
            },
            Err(e) => Err(e),
        }
    }

    async fn place_order(
        &self,
        user_id: i32,
        request: &CreateOrderRequest,
        key: Option<&str>,
    ) -> Result<CreateOrderOutcome, OrderError> {
        let mut tx = self.pool.begin().await?;

        let cart = CartRepository::lock_by_user(&mut tx, user_id).await?;
        let items = match &cart {
            Some(cart) => CartRepository::list_items(&mut tx, cart.id).await?,
            None => Vec::new(),
        };
        let cart = match cart {
            Some(cart) if !items.is_empty() => cart,
            _ => {
                // A retry that waited on the cart lock sees the cart already consumed
                if let Some(key) = key {
                    if let Some(existing) = find_by_key(&mut tx, user_id, key).await? {
                        return Ok(CreateOrderOutcome {
                            order: existing,
                            created: false,
                        });
                    }
                }
                return Err(OrderError::CartEmpty);
            }
        };

        let restaurant = RestaurantRepository::find_by_id(&mut tx, cart.restaurant_id)
            .await?
            .ok_or(OrderError::RestaurantNotFound(cart.restaurant_id))?;
        if !restaurant.accepts_orders() {
            return Err(OrderError::RestaurantUnavailable(restaurant.name));
        }

        let priced = price_cart(&mut tx, &cart, &items).await?;
        if !priced.is_fully_available() {
            let reasons = priced
                .unavailable
                .iter()
                .map(|line| format!("menu item {}: {}", line.menu_item_id, line.reason))
                .collect();
            return Err(OrderError::ItemsUnavailable(reasons));
        }
        if priced.subtotal < restaurant.min_order {
            return Err(OrderError::BelowMinimumOrder {
                subtotal: priced.subtotal,
                min_order: restaurant.min_order,
            });
        }

        let coupon = match request
            .coupon_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            Some(code) => Some(
                CouponValidator::validate_coupon(&mut tx, code, user_id, priced.subtotal, Utc::now())
                    .await?,
            ),
            None => None,
        };
        let discount = coupon.as_ref().map(|c| c.discount).unwrap_or(Decimal::ZERO);

        let wallet_balance = if request.use_wallet {
            Some(WalletLedger::lock_wallet(&mut tx, user_id).await?.balance)
        } else {
            None
        };
        let totals = PriceCalculator::settle(priced.subtotal, discount, wallet_balance);

        let order = OrdersRepository::insert(
            &mut tx,
            &NewOrder {
                id: Uuid::new_v4(),
                user_id,
                restaurant_id: restaurant.id,
                subtotal: totals.subtotal,
                discount_amount: totals.discount_amount,
                total_amount: totals.total_amount,
                wallet_amount_used: totals.wallet_amount_used,
                coupon_code: coupon.as_ref().map(|c| c.code.clone()),
                pickup_name: trimmed(request.pickup_name.as_deref()),
                notes: trimmed(request.notes.as_deref()),
                idempotency_key: key.map(str::to_string),
            },
        )
        .await?;

        let lines: Vec<NewOrderLine> = priced.lines.iter().map(snapshot_line).collect();
        let rows = OrderItemsRepository::insert_lines(&mut tx, order.id, &lines).await?;

        if totals.wallet_amount_used > Decimal::ZERO {
            WalletLedger::debit(
                &mut tx,
                user_id,
                totals.wallet_amount_used,
                &format!("Payment for order #{}", short_id(order.id)),
                Some(order.id),
            )
            .await?;
        }

        if let Some(applied) = &coupon {
            OutboxRepository::enqueue(
                &mut tx,
                &SideEffect::RecordCouponUsage {
                    coupon_id: applied.coupon_id,
                    user_id,
                    order_id: order.id,
                    discount: totals.discount_amount,
                },
            )
            .await?;
        }
        OutboxRepository::enqueue(
            &mut tx,
            &SideEffect::Notify(NotificationMessage::order_status(
                user_id,
                order.id,
                OrderStatus::Pending,
            )),
        )
        .await?;
        OutboxRepository::enqueue(
            &mut tx,
            &SideEffect::Notify(NotificationMessage::new_order(
                restaurant.owner_id,
                order.id,
                order.total_amount,
            )),
        )
        .await?;

        CartRepository::delete_cart(&mut tx, cart.id).await?;
        tx.commit().await?;

        tracing::info!(
            "Order {} placed by user {} at restaurant {}: subtotal={}, discount={}, total={}, wallet={}",
            order.id,
            user_id,
            restaurant.id,
            order.subtotal,
            order.discount_amount,
            order.total_amount,
            order.wallet_amount_used
        );

        let items = rows.into_iter().map(OrderLine::from).collect();
        Ok(CreateOrderOutcome {
            order: OrderResponse::new(order, items),
            created: true,
        })
    }

    /// Customer cancellation, legal while the order is pending or paid
    ///
    /// The status flip and the wallet refund commit together.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_order(
        &self,
        order_id: Uuid,
        user_id: i32,
    ) -> Result<OrderResponse, OrderError> {
        let mut tx = self.pool.begin().await?;

        let order = OrdersRepository::lock_by_id(&mut tx, order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;
        if order.user_id != user_id {
            return Err(OrderError::Forbidden(
                "You can only cancel your own orders".to_string(),
            ));
        }
        if !StatusMachine::is_valid_transition(order.status, OrderStatus::Cancelled, Role::Customer)
        {
            return Err(OrderError::NotCancellable(order.status));
        }

        let order = apply_cancellation(&mut tx, order).await?;
        let items = load_lines(&mut tx, order.id).await?;
        tx.commit().await?;
        self.outbox.wake();

        tracing::info!("Order {} cancelled by user {}", order.id, user_id);
        Ok(OrderResponse::new(order, items))
    }

    /// Copy a past order's lines back into the cart at current prices
    ///
    /// Variants and add-ons are matched by name. Lines that can no longer be
    /// ordered are reported in `skipped` instead of failing the call.
    #[tracing::instrument(skip(self))]
    pub async fn reorder_from_past_order(
        &self,
        order_id: Uuid,
        user_id: i32,
    ) -> Result<ReorderSummary, OrderError> {
        let mut tx = self.pool.begin().await?;

        let order = OrdersRepository::find_by_id(&mut tx, order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;
        if order.user_id != user_id {
            return Err(OrderError::Forbidden(
                "You can only reorder your own orders".to_string(),
            ));
        }

        // Refuses a cart that already holds another restaurant's items
        pin_cart(&mut tx, user_id, order.restaurant_id).await?;

        let lines = load_lines(&mut tx, order.id).await?;
        let menu_item_ids: Vec<i32> = lines.iter().map(|l| l.menu_item_id).collect();
        let snapshot = CatalogRepository::load_snapshot(&mut tx, &menu_item_ids).await?;

        let mut added = Vec::new();
        let mut skipped = Vec::new();
        for line in &lines {
            match resolve_reorder_line(&snapshot, order.restaurant_id, line) {
                Ok(new_line) => {
                    add_line(&mut tx, user_id, &new_line).await?;
                    added.push(ReorderedLine {
                        menu_item_id: line.menu_item_id,
                        name: line.name.clone(),
                        quantity: new_line.quantity,
                    });
                }
                Err(reason) => skipped.push(SkippedLine {
                    menu_item_id: line.menu_item_id,
                    name: line.name.clone(),
                    reason,
                }),
            }
        }

        let cart = load_view(&mut tx, user_id).await?;
        tx.commit().await?;

        tracing::info!(
            "Reorder of {} by user {}: {} added, {} skipped",
            order.id,
            user_id,
            added.len(),
            skipped.len()
        );
        Ok(ReorderSummary {
            added,
            skipped,
            cart,
        })
    }

    /// Fulfillment transition by the restaurant owner or an admin
    #[tracing::instrument(skip(self, actor, request), fields(actor_id = actor.user_id, role = %actor.role, to = %request.status))]
    pub async fn update_status(
        &self,
        actor: &AuthenticatedUser,
        order_id: Uuid,
        request: UpdateStatusRequest,
    ) -> Result<OrderResponse, OrderError> {
        if actor.role == Role::Customer {
            return Err(OrderError::Forbidden(
                "Customers can only cancel their orders".to_string(),
            ));
        }
        if request.preparation_time.is_some()
            && !StatusMachine::accepts_preparation_time(request.status)
        {
            return Err(OrderError::PreparationTimeNotAllowed(request.status));
        }

        let mut tx = self.pool.begin().await?;

        let order = OrdersRepository::lock_by_id(&mut tx, order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;
        let restaurant = RestaurantRepository::find_by_id(&mut tx, order.restaurant_id)
            .await?
            .ok_or(OrderError::RestaurantNotFound(order.restaurant_id))?;
        authorize_restaurant(actor, &restaurant)?;

        let from = order.status;
        let next = StatusMachine::transition(from, request.status, actor.role)?;

        let updated = match next {
            OrderStatus::Cancelled => apply_cancellation(&mut tx, order).await?,
            _ => {
                let preparation_time = (next == OrderStatus::Confirmed).then(|| {
                    request
                        .preparation_time
                        .unwrap_or(restaurant.default_preparation_time)
                });
                let payment_status = (next == OrderStatus::Paid).then_some(PaymentStatus::Paid);
                let updated = OrdersRepository::update_status(
                    &mut tx,
                    order.id,
                    next,
                    preparation_time,
                    payment_status,
                )
                .await?;
                notify(&mut tx, updated.user_id, updated.id, next).await?;
                updated
            }
        };

        let items = load_lines(&mut tx, updated.id).await?;
        tx.commit().await?;
        self.outbox.wake();

        tracing::info!("Order {} moved from {} to {}", updated.id, from, next);
        Ok(OrderResponse::new(updated, items))
    }

    /// Payment gateway confirmation: pending → paid with gateway references
    #[tracing::instrument(skip(self, request))]
    pub async fn confirm_payment(
        &self,
        order_id: Uuid,
        request: ConfirmPaymentRequest,
    ) -> Result<OrderResponse, OrderError> {
        let mut tx = self.pool.begin().await?;

        let order = OrdersRepository::lock_by_id(&mut tx, order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;
        // Only pending -> paid exists in the admin table
        StatusMachine::transition(order.status, OrderStatus::Paid, Role::Admin)?;

        let order = OrdersRepository::mark_paid(
            &mut tx,
            order.id,
            request.gateway_order_id.trim(),
            request.gateway_payment_id.trim(),
        )
        .await?;
        notify(&mut tx, order.user_id, order.id, OrderStatus::Paid).await?;
        let items = load_lines(&mut tx, order.id).await?;
        tx.commit().await?;
        self.outbox.wake();

        tracing::info!("Payment confirmed for order {}", order.id);
        Ok(OrderResponse::new(order, items))
    }

    /// Order detail, visible to the customer, the restaurant owner and admins
    pub async fn get_order(
        &self,
        order_id: Uuid,
        actor: &AuthenticatedUser,
    ) -> Result<OrderResponse, OrderError> {
        let mut conn = self.pool.acquire().await?;

        let order = OrdersRepository::find_by_id(&mut conn, order_id)
            .await?
            .ok_or(OrderError::NotFound(order_id))?;

        match actor.role {
            Role::Admin => {}
            Role::Customer if order.user_id == actor.user_id => {}
            Role::Owner => {
                let restaurant = RestaurantRepository::find_by_id(&mut conn, order.restaurant_id)
                    .await?
                    .ok_or(OrderError::RestaurantNotFound(order.restaurant_id))?;
                authorize_restaurant(actor, &restaurant)?;
            }
            Role::Customer => {
                return Err(OrderError::Forbidden(
                    "You can only view your own orders".to_string(),
                ))
            }
        }

        let items = load_lines(&mut conn, order.id).await?;
        Ok(OrderResponse::new(order, items))
    }

    /// Order history for a customer, newest first
    pub async fn list_user_orders(
        &self,
        user_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderResponse>, OrderError> {
        let mut conn = self.pool.acquire().await?;
        let orders = OrdersRepository::list_by_user(&mut conn, user_id, status).await?;
        with_lines(&mut conn, orders).await
    }

    /// A restaurant's order queue, oldest first
    pub async fn list_restaurant_orders(
        &self,
        actor: &AuthenticatedUser,
        restaurant_id: i32,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderResponse>, OrderError> {
        let mut conn = self.pool.acquire().await?;

        let restaurant = RestaurantRepository::find_by_id(&mut conn, restaurant_id)
            .await?
            .ok_or(OrderError::RestaurantNotFound(restaurant_id))?;
        authorize_restaurant(actor, &restaurant)?;

        let orders = OrdersRepository::list_by_restaurant(&mut conn, restaurant_id, status).await?;
        with_lines(&mut conn, orders).await
    }
}

/// Flip an order to cancelled, refund any wallet amount and notify the customer
async fn apply_cancellation(conn: &mut PgConnection, order: Order) -> Result<Order, OrderError> {
    let cancelled =
        OrdersRepository::update_status(conn, order.id, OrderStatus::Cancelled, None, None).await?;

    if order.wallet_amount_used > Decimal::ZERO {
        WalletLedger::credit(
            conn,
            order.user_id,
            order.wallet_amount_used,
            &format!("Refund for cancelled order #{}", short_id(order.id)),
            Some(order.id),
        )
        .await?;
        tracing::info!(
            "Refunded {} to wallet of user {} for order {}",
            order.wallet_amount_used,
            order.user_id,
            order.id
        );
    }

    notify(conn, cancelled.user_id, cancelled.id, OrderStatus::Cancelled).await?;
    Ok(cancelled)
}

async fn notify(
    conn: &mut PgConnection,
    user_id: i32,
    order_id: Uuid,
    status: OrderStatus,
) -> Result<(), OrderError> {
    let message = NotificationMessage::order_status(user_id, order_id, status);
    OutboxRepository::enqueue(conn, &SideEffect::Notify(message)).await?;
    Ok(())
}

async fn find_by_key(
    conn: &mut PgConnection,
    user_id: i32,
    key: &str,
) -> Result<Option<OrderResponse>, OrderError> {
    match OrdersRepository::find_by_idempotency_key(conn, user_id, key).await? {
        Some(order) => {
            let items = load_lines(conn, order.id).await?;
            Ok(Some(OrderResponse::new(order, items)))
        }
        None => Ok(None),
    }
}

async fn load_lines(conn: &mut PgConnection, order_id: Uuid) -> Result<Vec<OrderLine>, OrderError> {
    let rows = OrderItemsRepository::find_by_order_id(conn, order_id).await?;
    Ok(rows.into_iter().map(OrderLine::from).collect())
}

async fn with_lines(
    conn: &mut PgConnection,
    orders: Vec<Order>,
) -> Result<Vec<OrderResponse>, OrderError> {
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let rows = OrderItemsRepository::find_by_order_ids(conn, &ids).await?;

    let mut lines_by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    for row in rows {
        lines_by_order
            .entry(row.order_id)
            .or_default()
            .push(OrderLine::from(row));
    }

    Ok(orders
        .into_iter()
        .map(|order| {
            let items = lines_by_order.remove(&order.id).unwrap_or_default();
            OrderResponse::new(order, items)
        })
        .collect())
}

/// Owners may only act on their own restaurant; admins on any
fn authorize_restaurant(actor: &AuthenticatedUser, restaurant: &Restaurant) -> Result<(), OrderError> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Owner if restaurant.owner_id == actor.user_id => Ok(()),
        _ => Err(OrderError::Forbidden(format!(
            "You do not manage restaurant {}",
            restaurant.id
        ))),
    }
}

fn snapshot_line(line: &PricedLine) -> NewOrderLine {
    NewOrderLine {
        menu_item_id: line.menu_item_id,
        name: line.name.clone(),
        variant_name: line.variant_name.clone(),
        add_ons: line.add_ons.clone(),
        quantity: line.quantity,
        unit_price: line.unit_price,
        total_price: line.total_price,
    }
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn short_id(order_id: Uuid) -> String {
    order_id.simple().to_string()[..8].to_string()
}

/// Map a past order line onto today's catalog
///
/// Returns the reason the line cannot be reordered when the item, its variant
/// or one of its add-ons is gone or unavailable.
pub fn resolve_reorder_line(
    snapshot: &CatalogSnapshot,
    restaurant_id: i32,
    line: &OrderLine,
) -> Result<NewCartLine, String> {
    let item = snapshot
        .item(line.menu_item_id)
        .ok_or_else(|| UnavailableReason::ItemMissing.to_string())?;
    if item.restaurant_id != restaurant_id {
        return Err(UnavailableReason::WrongRestaurant.to_string());
    }
    if !item.is_available {
        return Err(UnavailableReason::ItemUnavailable.to_string());
    }

    let variant_id = match line.variant_name.as_deref() {
        Some(name) => {
            let variant = snapshot
                .variant_by_name(item.id, name)
                .ok_or_else(|| format!("variant '{}' no longer exists", name))?;
            if !variant.is_available {
                return Err(format!("variant '{}' is unavailable", name));
            }
            Some(variant.id)
        }
        None => None,
    };

    let mut add_ons: Vec<AddOnSnapshot> = Vec::with_capacity(line.add_ons.len());
    for past in &line.add_ons {
        let add_on = snapshot
            .add_on_by_name(item.id, &past.name)
            .ok_or_else(|| format!("add-on '{}' no longer exists", past.name))?;
        if !add_on.is_available {
            return Err(format!("add-on '{}' is unavailable", past.name));
        }
        if add_ons.iter().all(|a| a.id != add_on.id) {
            add_ons.push(AddOnSnapshot {
                id: add_on.id,
                name: add_on.name.clone(),
                price: add_on.price,
            });
        }
    }
    add_ons.sort_by_key(|a| a.id);

    Ok(NewCartLine {
        restaurant_id: item.restaurant_id,
        menu_item_id: item.id,
        variant_id,
        add_ons,
        quantity: line.quantity.clamp(1, MAX_LINE_QUANTITY),
    })
}
