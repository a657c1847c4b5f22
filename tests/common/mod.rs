//! Shared fixture: a server on an ephemeral port over a seeded in-memory
//! backend.

#![allow(dead_code, clippy::panic)]

use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Europe::Paris;

use coworking_booking::app_state::AppState;
use coworking_booking::backend::{Backend, InMemoryBackend};
use coworking_booking::build_app;
use coworking_booking::config::BookingConfig;
use coworking_booking::domain::{
    Booking, BookingId, BookingStatus, CompanyId, CreditBalance, Resource, ResourceId,
    ResourceStatus, ResourceType, SiteId, UserId,
};

/// A running server and the ids it was seeded with.
pub struct TestApp {
    pub addr: SocketAddr,
    pub backend: InMemoryBackend,
    pub site_id: SiteId,
    pub room_id: ResourceId,
    pub user_id: UserId,
    pub company_id: CompanyId,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Seeds a confirmed booking on the room, local Paris hours of `day`.
    pub async fn seed_booking(&self, day: NaiveDate, start_hour: u32, end_hour: u32) -> Booking {
        let booking = Booking {
            id: BookingId::new(),
            resource_id: self.room_id,
            user_id: self.user_id,
            company_id: Some(self.company_id),
            start: paris(day, start_hour),
            end: paris(day, end_hour),
            status: BookingStatus::Confirmed,
            credits_used: Some(f64::from(end_hour - start_hour) * 2.0),
            notes: None,
        };
        self.backend.insert_booking(booking.clone()).await;
        booking
    }
}

/// Monday 3 June 2030.
pub fn monday() -> NaiveDate {
    let Some(day) = NaiveDate::from_ymd_opt(2030, 6, 3) else {
        panic!("valid date");
    };
    day
}

/// Instant of `hour:00` on `day` in Paris.
pub fn paris(day: NaiveDate, hour: u32) -> DateTime<Utc> {
    let Some(local) = day.and_hms_opt(hour, 0, 0) else {
        panic!("valid time");
    };
    let Some(instant) = Paris.from_local_datetime(&local).single() else {
        panic!("unambiguous local time");
    };
    instant.with_timezone(&Utc)
}

/// Starts a server with one meeting room at two credits per hour and a
/// company holding `remaining` credits.
pub async fn spawn_app(remaining: f64) -> TestApp {
    let backend = InMemoryBackend::new();
    let site_id = SiteId::new();
    let room_id = ResourceId::new();
    let user_id = UserId::new();
    let company_id = CompanyId::new();

    backend
        .insert_resource(Resource {
            id: room_id,
            site_id,
            name: "Salle Verte".to_string(),
            resource_type: ResourceType::MeetingRoom,
            capacity: Some(8),
            hourly_credit_rate: Some(2.0),
            status: ResourceStatus::Available,
            equipment: BTreeSet::from(["screen".to_string()]),
            photos: Vec::new(),
        })
        .await;
    backend.add_user(user_id, company_id).await;
    backend
        .set_credit_balance(
            company_id,
            CreditBalance {
                allocated: 20.0,
                remaining,
            },
        )
        .await;

    let config = BookingConfig {
        wizard_success_delay: Duration::from_millis(50),
        ..BookingConfig::default()
    };
    let state = AppState::new(Backend::Memory(backend.clone()), config);
    let app = build_app(state);

    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind ephemeral port");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestApp {
        addr,
        backend,
        site_id,
        room_id,
        user_id,
        company_id,
    }
}
