pub mod applications;
pub mod blog;
pub mod collection;
pub mod ids;
pub mod inquiries;
pub mod model;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::info;

pub use collection::Collection;
pub use ids::IdGenerator;
pub use model::{
    Application, ApplicationStatus, BlogPost, Inquiry, InquiryStatus, NewApplication,
    NewBlogPost, NewInquiry, PostChanges, PostStatus, Record,
};

/// The three resource stores, shared by every request.
///
/// Cloning is cheap and every clone sees the same records.
#[derive(Clone)]
pub struct Store {
    applications: Collection<Application>,
    inquiries: Collection<Inquiry>,
    posts: Collection<BlogPost>,
    ids: Arc<IdGenerator>,
}

/// Full dump of a store, as written by `cradled export`.
#[derive(Debug, Serialize)]
pub struct Snapshot {
    pub applications: Vec<Application>,
    pub inquiries: Vec<Inquiry>,
    pub posts: Vec<BlogPost>,
}

impl Store {
    /// Empty process-lifetime store with the launch posts in place.
    pub fn in_memory() -> Result<Self> {
        let store = Self {
            applications: Collection::in_memory(),
            inquiries: Collection::in_memory(),
            posts: Collection::in_memory(),
            ids: Arc::new(IdGenerator::default()),
        };
        store.seed_posts()?;
        Ok(store)
    }

    /// Opens (or creates) a redb database at `path`. The launch posts are
    /// written only when the file is new.
    pub fn open(path: &Path) -> Result<Self> {
        let fresh = !path.exists();
        let db = Arc::new(
            redb::Database::create(path)
                .with_context(|| format!("open database {}", path.display()))?,
        );

        let applications = Collection::redb(db.clone())?;
        let inquiries = Collection::redb(db.clone())?;
        let posts = Collection::redb(db)?;

        let floor = [
            applications.max_numeric_id()?,
            inquiries.max_numeric_id()?,
            posts.max_numeric_id()?,
        ]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(0);

        let store = Self {
            applications,
            inquiries,
            posts,
            ids: Arc::new(IdGenerator::starting_after(floor)),
        };
        if fresh {
            store.seed_posts()?;
            info!(path = %path.display(), "created new database");
        }
        Ok(store)
    }

    pub fn snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot {
            applications: self.list_applications()?,
            inquiries: self.list_inquiries()?,
            posts: self.all_posts()?,
        })
    }

    fn next_id(&self, now: DateTime<Utc>) -> String {
        self.ids.next_at(now)
    }

    fn seed_posts(&self) -> Result<()> {
        for post in launch_posts() {
            self.posts.insert(post)?;
        }
        Ok(())
    }
}

fn launch_posts() -> Vec<BlogPost> {
    let jan = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).single();
    let feb = Utc.with_ymd_and_hms(2025, 2, 10, 0, 0, 0).single();
    let (Some(jan), Some(feb)) = (jan, feb) else {
        return Vec::new();
    };

    vec![
        BlogPost {
            id: "1".into(),
            title: "Welcome to Cradle Bridge Schools".into(),
            slug: "welcome-to-cradle-bridge-schools".into(),
            excerpt: Some(
                "We are excited to launch our new website and share our journey of academic excellence."
                    .into(),
            ),
            content: "Welcome to Cradle Bridge Schools, where we nurture young minds and build future leaders..."
                .into(),
            category: "Announcements".into(),
            author: "Admin".into(),
            image: "/images/blog/welcome.jpg".into(),
            status: PostStatus::Published,
            published_at: Some(jan),
            created_at: jan,
            updated_at: jan,
        },
        BlogPost {
            id: "2".into(),
            title: "Inter-House Sports Competition 2025".into(),
            slug: "inter-house-sports-competition-2025".into(),
            excerpt: Some(
                "Our annual inter-house sports competition showcased amazing talents and teamwork."
                    .into(),
            ),
            content: "The 2025 Inter-House Sports Competition was a huge success...".into(),
            category: "Events".into(),
            author: "Sports Coordinator".into(),
            image: "/images/blog/sports.jpg".into(),
            status: PostStatus::Published,
            published_at: Some(feb),
            created_at: feb,
            updated_at: feb,
        },
    ]
}
