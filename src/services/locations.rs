use async_trait::async_trait;
use dashmap::DashMap;
use tracing::warn;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{Location, LocationType};

/// Read access to warehouse addresses, owned outside the receiving workflow.
#[async_trait]
pub trait LocationRegistry: Send + Sync {
    async fn get(&self, location_id: Uuid) -> Result<Option<Location>, ServiceError>;

    async fn list_by_type(&self, location_type: LocationType)
        -> Result<Vec<Location>, ServiceError>;
}

/// Looks up `location_id` and checks it is a usable location of `expected` type.
pub async fn require_location(
    registry: &dyn LocationRegistry,
    location_id: Uuid,
    expected: LocationType,
) -> Result<Location, ServiceError> {
    let location = registry.get(location_id).await?.ok_or_else(|| {
        ServiceError::validation(format!("location {} does not exist", location_id))
    })?;

    if location.location_type != expected {
        return Err(ServiceError::validation(format!(
            "location {} is a {} location, expected {}",
            location.code, location.location_type, expected
        )));
    }
    if !location.is_usable() {
        return Err(ServiceError::validation(format!(
            "location {} is inactive or blocked",
            location.code
        )));
    }
    Ok(location)
}

#[derive(Debug, Default)]
pub struct InMemoryLocationRegistry {
    locations: DashMap<Uuid, Location>,
}

impl InMemoryLocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_locations(locations: impl IntoIterator<Item = Location>) -> Self {
        let registry = Self::new();
        for location in locations {
            registry.upsert(location);
        }
        registry
    }

    pub fn upsert(&self, location: Location) {
        if location.location_type != LocationType::Dock && location.address().is_none() {
            warn!(
                code = %location.code,
                "storage location code does not follow aisle-rack-level-slot"
            );
        }
        self.locations.insert(location.id, location);
    }
}

#[async_trait]
impl LocationRegistry for InMemoryLocationRegistry {
    async fn get(&self, location_id: Uuid) -> Result<Option<Location>, ServiceError> {
        Ok(self.locations.get(&location_id).map(|l| l.value().clone()))
    }

    async fn list_by_type(
        &self,
        location_type: LocationType,
    ) -> Result<Vec<Location>, ServiceError> {
        let mut found: Vec<Location> = self
            .locations
            .iter()
            .filter(|l| l.location_type == location_type)
            .map(|l| l.value().clone())
            .collect();
        found.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(found)
    }
}

/// Which active document currently occupies each dock.
#[derive(Debug, Default)]
pub struct DockBoard {
    occupancy: DashMap<Uuid, Uuid>,
}

impl DockBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags `dock_id` as occupied by `document_id`.
    ///
    /// Returns the other document that held the dock, if any. Taking an
    /// occupied dock is allowed; the caller decides what to do with the
    /// warning.
    pub fn occupy(&self, dock_id: Uuid, document_id: Uuid) -> Option<Uuid> {
        self.occupancy
            .insert(dock_id, document_id)
            .filter(|previous| *previous != document_id)
    }

    /// Frees the dock if `document_id` still holds it.
    pub fn release(&self, dock_id: Uuid, document_id: Uuid) {
        self.occupancy
            .remove_if(&dock_id, |_, occupant| *occupant == document_id);
    }

    pub fn occupant(&self, dock_id: Uuid) -> Option<Uuid> {
        self.occupancy.get(&dock_id).map(|entry| *entry.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn require_location_checks_type_and_usability() {
        let dock = Location::new("DOCK-01", LocationType::Dock);
        let staging = Location::new("ST-01-00-01", LocationType::Staging);
        let mut blocked = Location::new("DOCK-02", LocationType::Dock);
        blocked.blocked = true;
        let registry = InMemoryLocationRegistry::with_locations([
            dock.clone(),
            staging.clone(),
            blocked.clone(),
        ]);

        assert!(require_location(&registry, dock.id, LocationType::Dock)
            .await
            .is_ok());
        assert_matches!(
            require_location(&registry, staging.id, LocationType::Dock).await,
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            require_location(&registry, blocked.id, LocationType::Dock).await,
            Err(ServiceError::ValidationError(_))
        );
        assert_matches!(
            require_location(&registry, Uuid::new_v4(), LocationType::Dock).await,
            Err(ServiceError::ValidationError(_))
        );
    }

    #[tokio::test]
    async fn list_by_type_is_sorted_by_code() {
        let registry = InMemoryLocationRegistry::with_locations([
            Location::new("DOCK-02", LocationType::Dock),
            Location::new("DOCK-01", LocationType::Dock),
            Location::new("01-A-01-01", LocationType::Reserve),
        ]);
        let docks = registry.list_by_type(LocationType::Dock).await.unwrap();
        let codes: Vec<_> = docks.iter().map(|l| l.code.as_str()).collect();
        assert_eq!(codes, vec!["DOCK-01", "DOCK-02"]);
    }

    #[test]
    fn dock_board_reports_previous_occupant() {
        let board = DockBoard::new();
        let dock = Uuid::new_v4();
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());

        assert_eq!(board.occupy(dock, first), None);
        assert_eq!(board.occupy(dock, first), None);
        assert_eq!(board.occupy(dock, second), Some(first));

        board.release(dock, first);
        assert_eq!(board.occupant(dock), Some(second));
        board.release(dock, second);
        assert_eq!(board.occupant(dock), None);
    }
}
