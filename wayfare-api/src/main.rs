use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use wayfare_api::middleware::resiliency::ResiliencyState;
use wayfare_api::{app, state::AppState, worker};
use wayfare_booking::commit::{BookingCommitService, MockPaymentGateway};
use wayfare_booking::repository::BookingRepository;
use wayfare_booking::wizard::WizardManager;
use wayfare_catalog::ledger::CapacityLedger;
use wayfare_catalog::schedule::Schedule;
use wayfare_catalog::tour::{
    MealSession, MealSlot, RoomTemplate, RoomUpgradeTier, TourTemplate, TransportLeg,
    TransportLegKind,
};
use wayfare_pricing::model::PricingModel;
use wayfare_store::memory::{MemoryBookingStore, MemoryCatalogStore};
use wayfare_store::postgres::PgBookingStore;
use wayfare_store::telemetry::BookingTelemetry;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "wayfare_api=debug,wayfare_booking=info,wayfare_store=info,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = wayfare_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Wayfare API on port {}", config.server.port);

    let ledger = Arc::new(CapacityLedger::new());

    let catalog = Arc::new(MemoryCatalogStore::new());
    if config.booking_rules.seed_demo_catalog {
        seed_demo_catalog(&catalog, &ledger).await;
    }

    let bookings: Arc<dyn BookingRepository> = if config.database.url.is_empty() {
        tracing::info!("No database configured, keeping bookings in memory");
        Arc::new(MemoryBookingStore::new())
    } else {
        let db = wayfare_store::DbClient::new(&config.database.url)
            .await
            .expect("Failed to connect to Postgres");
        db.migrate().await.expect("Failed to run migrations");
        Arc::new(PgBookingStore::new(db.pool.clone()))
    };

    let pricing = PricingModel::new(
        config.booking_rules.service_fee_bps,
        config.booking_rules.currency.clone(),
    );

    let wizards = Arc::new(RwLock::new(WizardManager::new(
        pricing.clone(),
        config.booking_rules.session_idle(),
    )));

    let gateway = Arc::new(MockPaymentGateway::new());
    let commit = Arc::new(BookingCommitService::new(
        ledger.clone(),
        gateway,
        bookings.clone(),
        pricing,
        config.booking_rules.reservation_hold(),
    ));

    let app_state = AppState {
        catalog: catalog.clone(),
        bookings,
        ledger: ledger.clone(),
        wizards: wizards.clone(),
        commit,
        telemetry: Arc::new(BookingTelemetry::new()),
        resiliency: Arc::new(ResiliencyState::new()),
    };

    let _worker =
        worker::start_maintenance_worker(ledger, wizards, std::time::Duration::from_secs(60));

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}

async fn seed_demo_catalog(catalog: &MemoryCatalogStore, ledger: &CapacityLedger) {
    let tour = TourTemplate {
        id: Uuid::new_v4(),
        name: "Flores Overland".to_string(),
        description: Some("Four nights overland from Labuan Bajo to Ende".to_string()),
        base_price_per_person: 1_000_000,
        duration_nights: 4,
        room: RoomTemplate {
            standard_price_per_night: 200_000,
            upgrade_tiers: vec![RoomUpgradeTier {
                id: "deluxe".to_string(),
                name: "Deluxe Sea View".to_string(),
                upgrade_delta_per_room_per_night: 150_000,
            }],
            quad_price_per_night: Some(350_000),
        },
        meal_plan: vec![
            MealSlot {
                day: 1,
                session: MealSession::Evening,
                price_per_person: 80_000,
            },
            MealSlot {
                day: 2,
                session: MealSession::Noon,
                price_per_person: 70_000,
            },
            MealSlot {
                day: 3,
                session: MealSession::Morning,
                price_per_person: 50_000,
            },
        ],
        transport_legs: vec![
            TransportLeg {
                kind: TransportLegKind::Outbound,
                description: "Charter bus from Labuan Bajo".to_string(),
                price_per_person: 150_000,
            },
            TransportLeg {
                kind: TransportLegKind::Return,
                description: "Flight back from Ende".to_string(),
                price_per_person: 150_000,
            },
        ],
        is_active: true,
        metadata: serde_json::json!({ "region": "Nusa Tenggara Timur" }),
    };

    let today = chrono::Utc::now().date_naive();
    for offset in [30i64, 60, 90] {
        let departure = today + chrono::Duration::days(offset);
        let schedule = Schedule {
            id: Uuid::new_v4(),
            tour_id: tour.id,
            departure_date: departure,
            return_date: departure + chrono::Duration::days(tour.duration_nights as i64),
            capacity_total: 20,
            capacity_reserved: 0,
        };
        ledger.register(&schedule);
        catalog.insert_schedule(schedule).await;
    }

    tracing::info!("Seeded demo tour {} ({})", tour.name, tour.id);
    catalog.insert_tour(tour).await;
}
