use async_trait::async_trait;
use boletera_core::repository::MasterDataRepository;
use boletera_core::{StoreError, StoreResult};
use boletera_shared::{Bus, Client, Route, RouteStop, Seat, Trip};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use uuid::Uuid;

/// In-memory master-data store for tests and embedded use. A real
/// deployment puts a database behind `MasterDataRepository` instead.
pub struct MemoryStore {
    trips: RwLock<HashMap<Uuid, Trip>>,
    buses: RwLock<HashMap<Uuid, Bus>>,
    seats: RwLock<HashMap<Uuid, Vec<Seat>>>,
    routes: RwLock<HashMap<Uuid, Route>>,
    route_stops: RwLock<HashMap<Uuid, Vec<RouteStop>>>,
    clients: RwLock<HashMap<Uuid, Client>>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            trips: RwLock::new(HashMap::new()),
            buses: RwLock::new(HashMap::new()),
            seats: RwLock::new(HashMap::new()),
            routes: RwLock::new(HashMap::new()),
            route_stops: RwLock::new(HashMap::new()),
            clients: RwLock::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn add_trip(&self, trip: Trip) {
        self.trips.write().unwrap().insert(trip.id, trip);
    }

    pub fn add_bus(&self, bus: Bus) {
        self.buses.write().unwrap().insert(bus.id, bus);
    }

    pub fn add_client(&self, client: Client) {
        self.clients.write().unwrap().insert(client.id, client);
    }

    /// Seed a bus layout; seats are grouped by their bus id
    pub fn add_seats(&self, seats: Vec<Seat>) {
        let mut map = self.seats.write().unwrap();
        for seat in seats {
            map.entry(seat.bus_id).or_default().push(seat);
        }
    }

    pub fn add_route(&self, route: Route, mut stops: Vec<RouteStop>) {
        stops.sort_by_key(|s| s.order);
        self.route_stops.write().unwrap().insert(route.id, stops);
        self.routes.write().unwrap().insert(route.id, route);
    }

    /// Simulate a storage outage; every call fails until cleared
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MasterDataRepository for MemoryStore {
    async fn trip(&self, id: Uuid) -> StoreResult<Option<Trip>> {
        self.check_available()?;
        Ok(self.trips.read().unwrap().get(&id).cloned())
    }

    async fn bus(&self, id: Uuid) -> StoreResult<Option<Bus>> {
        self.check_available()?;
        Ok(self.buses.read().unwrap().get(&id).cloned())
    }

    async fn seats_for_bus(&self, bus_id: Uuid) -> StoreResult<Vec<Seat>> {
        self.check_available()?;
        Ok(self
            .seats
            .read()
            .unwrap()
            .get(&bus_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn route(&self, id: Uuid) -> StoreResult<Option<Route>> {
        self.check_available()?;
        Ok(self.routes.read().unwrap().get(&id).cloned())
    }

    async fn stops_for_route(&self, route_id: Uuid) -> StoreResult<Vec<RouteStop>> {
        self.check_available()?;
        Ok(self
            .route_stops
            .read()
            .unwrap()
            .get(&route_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn client(&self, id: Uuid) -> StoreResult<Option<Client>> {
        self.check_available()?;
        Ok(self.clients.read().unwrap().get(&id).cloned())
    }
}
