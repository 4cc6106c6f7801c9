use crate::StoreResult;
use async_trait::async_trait;
use boletera_shared::{Bus, Client, Route, RouteStop, Seat, Trip};
use uuid::Uuid;

/// Read access to the master-data store (trips, buses, routes, clients).
/// The engines treat this as a read-mostly reference source; persistence
/// of their own entities is out of scope for the trait.
#[async_trait]
pub trait MasterDataRepository: Send + Sync {
    async fn trip(&self, id: Uuid) -> StoreResult<Option<Trip>>;

    async fn bus(&self, id: Uuid) -> StoreResult<Option<Bus>>;

    /// Fixed seat layout of a bus, used to materialize a trip's seat map
    async fn seats_for_bus(&self, bus_id: Uuid) -> StoreResult<Vec<Seat>>;

    async fn route(&self, id: Uuid) -> StoreResult<Option<Route>>;

    /// Stops of a route ordered by their `order` column
    async fn stops_for_route(&self, route_id: Uuid) -> StoreResult<Vec<RouteStop>>;

    async fn client(&self, id: Uuid) -> StoreResult<Option<Client>>;
}
