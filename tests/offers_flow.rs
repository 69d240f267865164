use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::{DateTime, Duration, Utc};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
    Statement,
};
use tokio::task::JoinSet;
use tower::ServiceExt;
use waste_market_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::offers::{
        CounterResponseAction, CounterResponseRequest, CreateOfferRequest, OfferAction,
        UpdateOfferStatusRequest,
    },
    entity::{
        categories::ActiveModel as CategoryActive,
        listings::{ActiveModel as ListingActive, Entity as Listings},
        offers::{ActiveModel as OfferActive, Column as OfferCol, Entity as Offers},
        sea_orm_active_enums::{ListingStatus, ListingType, OfferStatus, UserRole, UserStatus},
        users::ActiveModel as UserActive,
    },
    error::AppError,
    middleware::auth::{AuthUser, issue_token},
    routes::{
        create_api_router,
        params::{CategoryQuery, OfferListQuery},
    },
    services::{category_service, offer_service},
    state::AppState,
};

const JWT_SECRET: &str = "flow-secret";

// Full negotiation against a real database: create, counter, accept, expire.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn offer_negotiation_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let seller = AuthUser {
        user_id: create_user(&state, "seller@example.com", UserRole::Seller).await?,
    };
    let buyer = AuthUser {
        user_id: create_user(&state, "buyer@example.com", UserRole::Buyer).await?,
    };
    let outsider = AuthUser {
        user_id: create_user(&state, "outsider@example.com", UserRole::Buyer).await?,
    };
    let category_id = create_category(&state).await?;
    let listing_id = create_listing(&state, seller.user_id, category_id, 100).await?;

    // Self-dealing and overselling are refused.
    let err = offer_service::create_offer(&state, &seller, new_offer(listing_id, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    let err = offer_service::create_offer(&state, &buyer, new_offer(listing_id, 101))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let created = offer_service::create_offer(&state, &buyer, new_offer(listing_id, 10))
        .await?
        .data
        .unwrap();
    let offer_id = created.offer.id;
    assert_eq!(created.offer.status, OfferStatus::Pending);
    assert_eq!(created.offer.seller_id, seller.user_id);
    assert_eq!(created.seller.id, seller.user_id);

    let err = offer_service::create_offer(&state, &buyer, new_offer(listing_id, 5))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Visibility is limited to the two parties.
    let err = offer_service::get_offer_by_id(&state, &outsider, offer_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound));
    offer_service::get_offer_by_id(&state, &buyer, offer_id).await?;

    // Only the seller updates.
    for user in [&buyer, &outsider] {
        let err = offer_service::update_offer_status(&state, user, offer_id, action(OfferAction::Accept))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    let mut counter = action(OfferAction::Counter);
    counter.counter_price = Some(950);
    counter.counter_quantity = Some(8);
    let countered = offer_service::update_offer_status(&state, &seller, offer_id, counter)
        .await?
        .data
        .unwrap();
    assert_eq!(countered.offer.status, OfferStatus::Countered);
    assert_eq!(countered.offer.counter_price, Some(950));

    let err = offer_service::update_offer_status(&state, &seller, offer_id, action(OfferAction::Accept))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let accepted = offer_service::respond_to_counter(
        &state,
        &buyer,
        offer_id,
        CounterResponseRequest {
            action: CounterResponseAction::Accept,
            message: None,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(accepted.offer.status, OfferStatus::Accepted);
    let item = accepted.order_item.expect("order item");
    assert_eq!(item.quantity, 8);
    assert_eq!(item.subtotal, 950 * 8);

    let listing = Listings::find_by_id(listing_id).one(&state.orm).await?.unwrap();
    assert_eq!(listing.quantity, 92);

    // Terminal offers are frozen.
    for act in [OfferAction::Accept, OfferAction::Reject, OfferAction::Counter] {
        let mut update = action(act);
        update.counter_price = Some(1);
        let err = offer_service::update_offer_status(&state, &seller, offer_id, update)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    // Sweeper expires stale offers.
    let stale = offer_service::create_offer(&state, &buyer, new_offer(listing_id, 5))
        .await?
        .data
        .unwrap();
    backdate(&state, stale.offer.id).await?;
    let expired = offer_service::expire_stale_offers(&state, Utc::now()).await?;
    assert_eq!(expired, 1);
    let err = offer_service::update_offer_status(&state, &seller, stale.offer.id, action(OfferAction::Reject))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // An action on a stale offer expires it on the spot.
    let late = offer_service::create_offer(&state, &buyer, new_offer(listing_id, 5))
        .await?
        .data
        .unwrap();
    backdate(&state, late.offer.id).await?;
    let err = offer_service::update_offer_status(&state, &seller, late.offer.id, action(OfferAction::Accept))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("expired")));
    let late = Offers::find_by_id(late.offer.id).one(&state.orm).await?.unwrap();
    assert_eq!(late.status, OfferStatus::Expired);

    // Listings and pagination.
    let sent = offer_service::get_sent_offers(
        &state,
        &buyer,
        OfferListQuery {
            page: Some(2),
            page_size: Some(1),
            ..Default::default()
        },
    )
    .await?;
    let meta = sent.meta.unwrap();
    assert_eq!(meta.total, Some(3));
    assert_eq!(meta.page_size, Some(1));
    let items = sent.data.unwrap().items;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].counterpart.id, seller.user_id);

    let received = offer_service::get_received_offers(
        &state,
        &seller,
        OfferListQuery {
            status_filter: Some(OfferStatus::Accepted),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(received.meta.unwrap().total, Some(1));
    assert_eq!(received.data.unwrap().items[0].id, offer_id);

    let none = offer_service::get_sent_offers(&state, &outsider, OfferListQuery::default()).await?;
    assert_eq!(none.meta.unwrap().total, Some(0));

    // A seller rejection keeps the reason.
    let small_lot = create_listing(&state, seller.user_id, category_id, 20).await?;
    let first = offer_service::create_offer(&state, &buyer, new_offer(small_lot, 10))
        .await?
        .data
        .unwrap();
    let mut reject = action(OfferAction::Reject);
    reject.message = Some("Price too low".into());
    let rejected = offer_service::update_offer_status(&state, &seller, first.offer.id, reject)
        .await?
        .data
        .unwrap();
    assert_eq!(rejected.offer.status, OfferStatus::Rejected);
    assert_eq!(rejected.offer.rejection_reason.as_deref(), Some("Price too low"));

    // Counters cannot ask for more than the stock and they restart the clock.
    let second = offer_service::create_offer(&state, &buyer, new_offer(small_lot, 10))
        .await?
        .data
        .unwrap();
    let mut too_many = action(OfferAction::Counter);
    too_many.counter_price = Some(1_100);
    too_many.counter_quantity = Some(21);
    let err = offer_service::update_offer_status(&state, &seller, second.offer.id, too_many)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("Insufficient stock")));

    set_expiry(&state, second.offer.id, Utc::now() + Duration::hours(1)).await?;
    let mut counter = action(OfferAction::Counter);
    counter.counter_price = Some(1_100);
    counter.message = Some("Best I can do".into());
    let countered = offer_service::update_offer_status(&state, &seller, second.offer.id, counter)
        .await?
        .data
        .unwrap();
    assert_eq!(countered.offer.status, OfferStatus::Countered);
    assert_eq!(countered.offer.counter_message.as_deref(), Some("Best I can do"));
    assert!(countered.offer.expires_at > Utc::now() + Duration::hours(167));

    // The buyer may turn the counter down; stock is untouched.
    let declined = offer_service::respond_to_counter(
        &state,
        &buyer,
        second.offer.id,
        CounterResponseRequest {
            action: CounterResponseAction::Reject,
            message: Some("Too expensive".into()),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(declined.offer.status, OfferStatus::Rejected);
    assert_eq!(declined.offer.rejection_reason.as_deref(), Some("Too expensive"));
    assert!(declined.order_item.is_none());
    let lot = Listings::find_by_id(small_lot).one(&state.orm).await?.unwrap();
    assert_eq!(lot.quantity, 20);

    // Accepting the whole stock sells the listing out.
    let last_lot = create_listing(&state, seller.user_id, category_id, 5).await?;
    let whole = offer_service::create_offer(&state, &buyer, new_offer(last_lot, 5))
        .await?
        .data
        .unwrap();
    offer_service::update_offer_status(&state, &seller, whole.offer.id, action(OfferAction::Accept))
        .await?;
    let sold = Listings::find_by_id(last_lot).one(&state.orm).await?.unwrap();
    assert_eq!(sold.quantity, 0);
    assert_eq!(sold.status, ListingStatus::Sold);
    let err = offer_service::create_offer(&state, &outsider, new_offer(last_lot, 1))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // A listing withdrawn after the offer was made can no longer be accepted.
    let withdrawn = create_listing(&state, seller.user_id, category_id, 10).await?;
    let pending = offer_service::create_offer(&state, &buyer, new_offer(withdrawn, 2))
        .await?
        .data
        .unwrap();
    set_listing_status(&state, withdrawn, ListingStatus::Inactive).await?;
    let err = offer_service::update_offer_status(&state, &seller, pending.offer.id, action(OfferAction::Accept))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("no longer available")));
    let pending = Offers::find_by_id(pending.offer.id).one(&state.orm).await?.unwrap();
    assert_eq!(pending.status, OfferStatus::Pending);
    let listing = Listings::find_by_id(withdrawn).one(&state.orm).await?.unwrap();
    assert_eq!(listing.quantity, 10);

    // Concurrent creates by one buyer on one listing leave a single open offer.
    let contested = create_listing(&state, seller.user_id, category_id, 100).await?;
    let mut creates = JoinSet::new();
    for _ in 0..8 {
        let state = state.clone();
        creates.spawn(async move {
            offer_service::create_offer(&state, &outsider, new_offer(contested, 1)).await
        });
    }
    let (mut created, mut conflicts) = (0, 0);
    while let Some(result) = creates.join_next().await {
        match result? {
            Ok(_) => created += 1,
            Err(AppError::Conflict(_)) => conflicts += 1,
            Err(err) => panic!("unexpected error: {err:?}"),
        }
    }
    assert_eq!((created, conflicts), (1, 7));
    let open = Offers::find()
        .filter(OfferCol::ListingId.eq(contested))
        .filter(OfferCol::BuyerId.eq(outsider.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(open, 1);

    // Categories are an unpaged list.
    let categories = category_service::list_categories(&state, CategoryQuery::default()).await?;
    let meta = categories.meta.unwrap();
    assert_eq!(meta.total, Some(1));
    assert_eq!(meta.page_size, None);
    let products = category_service::list_categories(
        &state,
        CategoryQuery {
            listing_type: Some(ListingType::Product),
        },
    )
    .await?;
    let meta = products.meta.unwrap();
    assert_eq!(meta.total, Some(0));
    assert_eq!(meta.page_size, None);

    // Over HTTP, the trailing-slash create route answers 201 with the envelope.
    let http_lot = create_listing(&state, seller.user_id, category_id, 50).await?;
    let token = issue_token(buyer.user_id, JWT_SECRET, Duration::hours(1))?;
    let app = Router::new()
        .nest("/api", create_api_router())
        .with_state(state.clone());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/offers/")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(format!(
                    r#"{{"listing_id":{http_lot},"offer_price":800,"quantity":3}}"#
                )))?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await?;
    let body: serde_json::Value = serde_json::from_slice(&bytes)?;
    assert_eq!(body["message"], "Offer created");
    assert_eq!(body["data"]["offer"]["status"], "pending");
    assert_eq!(body["data"]["offer"]["buyer_id"], buyer.user_id);
    assert_eq!(body["data"]["offer"]["quantity"], 3);

    Ok(())
}

fn new_offer(listing_id: i64, quantity: i32) -> CreateOfferRequest {
    CreateOfferRequest {
        listing_id,
        offer_price: 900,
        quantity,
        message: Some("Can pick up next week".into()),
    }
}

fn action(action: OfferAction) -> UpdateOfferStatusRequest {
    UpdateOfferStatusRequest {
        action,
        counter_price: None,
        counter_quantity: None,
        message: None,
    }
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    run_migrations(&pool).await?;

    let config = AppConfig {
        database_url: database_url.to_string(),
        host: "127.0.0.1".into(),
        port: 0,
        jwt_secret: Some(JWT_SECRET.into()),
        fallback_user_id: None,
        offer_ttl_hours: 168,
        expiry_sweep_secs: 300,
    };
    let state = AppState::new(pool, config);

    // Clean tables between runs
    let backend = state.orm.get_database_backend();
    state
        .orm
        .execute(Statement::from_string(
            backend,
            "TRUNCATE TABLE order_items, offers, listing_images, listings, categories, audit_logs, users RESTART IDENTITY CASCADE",
        ))
        .await?;

    Ok(state)
}

async fn create_user(state: &AppState, email: &str, role: UserRole) -> anyhow::Result<i64> {
    let user = UserActive {
        id: NotSet,
        email: Set(email.to_string()),
        full_name: Set(email.split('@').next().unwrap_or(email).to_string()),
        role: Set(role),
        status: Set(UserStatus::Active),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}

async fn create_category(state: &AppState) -> anyhow::Result<i64> {
    let category = CategoryActive {
        id: NotSet,
        name: Set("Plastics".into()),
        slug: Set("plastics".into()),
        listing_type: Set(ListingType::Material),
        description: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(category.id)
}

async fn create_listing(
    state: &AppState,
    seller_id: i64,
    category_id: i64,
    quantity: i32,
) -> anyhow::Result<i64> {
    let listing = ListingActive {
        id: NotSet,
        seller_id: Set(seller_id),
        category_id: Set(category_id),
        title: Set("Baled PET bottles".into()),
        description: Set(None),
        listing_type: Set(ListingType::Material),
        price: Set(1_000),
        quantity: Set(quantity),
        unit_measure: Set("kg".into()),
        status: Set(ListingStatus::Active),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(listing.id)
}

async fn set_listing_status(
    state: &AppState,
    listing_id: i64,
    status: ListingStatus,
) -> anyhow::Result<()> {
    let listing = Listings::find_by_id(listing_id).one(&state.orm).await?.unwrap();
    let mut active: ListingActive = listing.into();
    active.status = Set(status);
    active.update(&state.orm).await?;
    Ok(())
}

async fn backdate(state: &AppState, offer_id: i64) -> anyhow::Result<()> {
    set_expiry(state, offer_id, Utc::now() - Duration::hours(1)).await
}

async fn set_expiry(state: &AppState, offer_id: i64, at: DateTime<Utc>) -> anyhow::Result<()> {
    let offer = Offers::find_by_id(offer_id).one(&state.orm).await?.unwrap();
    let mut active: OfferActive = offer.into();
    active.expires_at = Set(at.into());
    active.update(&state.orm).await?;
    Ok(())
}
