use anyhow::Result;
use chrono::Utc;

use super::{Inquiry, InquiryStatus, NewInquiry, Store};

impl Store {
    pub fn submit_inquiry(&self, fields: NewInquiry) -> Result<Inquiry> {
        let now = Utc::now();
        let inquiry = Inquiry::new(self.next_id(now), fields, now);
        self.inquiries.insert(inquiry.clone())?;
        Ok(inquiry)
    }

    /// All inquiries, newest first.
    pub fn list_inquiries(&self) -> Result<Vec<Inquiry>> {
        let mut all = self.inquiries.all()?;
        all.reverse();
        all.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(all)
    }

    pub fn get_inquiry(&self, id: &str) -> Result<Option<Inquiry>> {
        self.inquiries.get(id)
    }

    pub fn set_inquiry_status(&self, id: &str, status: InquiryStatus) -> Result<Option<Inquiry>> {
        let now = Utc::now();
        self.inquiries.update(id, |i| {
            i.status = status;
            i.updated_at = Some(now);
        })
    }

    pub fn delete_inquiry(&self, id: &str) -> Result<bool> {
        self.inquiries.remove(id)
    }
}
