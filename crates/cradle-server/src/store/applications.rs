use anyhow::Result;
use chrono::Utc;

use super::{Application, ApplicationStatus, NewApplication, Store};

impl Store {
    /// Stores a validated application with a fresh id, `pending` status and
    /// the current instant as `submitted_at`.
    pub fn submit_application(&self, fields: NewApplication) -> Result<Application> {
        let now = Utc::now();
        let application = Application::new(self.next_id(now), fields, now);
        self.applications.insert(application.clone())?;
        Ok(application)
    }

    /// All applications, newest submission first.
    pub fn list_applications(&self) -> Result<Vec<Application>> {
        let mut all = self.applications.all()?;
        // Reversed first so equal timestamps list the later insert first.
        all.reverse();
        all.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(all)
    }

    pub fn get_application(&self, id: &str) -> Result<Option<Application>> {
        self.applications.get(id)
    }

    pub fn set_application_status(
        &self,
        id: &str,
        status: ApplicationStatus,
    ) -> Result<Option<Application>> {
        let now = Utc::now();
        self.applications.update(id, |a| {
            a.status = status;
            a.updated_at = Some(now);
        })
    }

    pub fn delete_application(&self, id: &str) -> Result<bool> {
        self.applications.remove(id)
    }
}
