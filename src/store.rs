use crate::error::StoreError;
use crate::models::{Application, ApplicationId, StatusTransition};

/// Record store the tracker reads from and writes to.
///
/// `applied_date` is fixed once a record exists: an update keeps the stored
/// value whatever the incoming record says.
pub trait ApplicationStore {
    fn list_applications(&self, user_id: &str) -> Result<Vec<Application>, StoreError>;
    fn get_application(&self, id: &ApplicationId) -> Result<Option<Application>, StoreError>;
    fn put_application(&self, application: &Application) -> Result<(), StoreError>;

    /// Writes a batch. Transactional stores write all of it or none of it.
    fn put_all(&self, applications: &[Application]) -> Result<(), StoreError> {
        for application in applications {
            self.put_application(application)?;
        }
        Ok(())
    }

    /// Writes a status change together with its history entry. Stores
    /// without history keep only the record.
    fn put_with_transition(
        &self,
        application: &Application,
        _transition: &StatusTransition,
    ) -> Result<(), StoreError> {
        self.put_application(application)
    }

    fn transitions(&self, _id: &ApplicationId) -> Result<Vec<StatusTransition>, StoreError> {
        Ok(Vec::new())
    }
}
