use anyhow::Result;
use chrono::Utc;

use super::{BlogPost, NewBlogPost, PostChanges, Store};

impl Store {
    pub fn create_post(&self, fields: NewBlogPost) -> Result<BlogPost> {
        let now = Utc::now();
        let post = BlogPost::new(self.next_id(now), fields, now);
        self.posts.insert(post.clone())?;
        Ok(post)
    }

    /// Published posts, most recently published first, optionally narrowed to
    /// one category (case-insensitive) and truncated to `limit`.
    pub fn published_posts(
        &self,
        category: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<BlogPost>> {
        let category = category.map(str::to_lowercase);
        let mut posts: Vec<_> = self
            .posts
            .all()?
            .into_iter()
            .filter(|p| p.is_published())
            .filter(|p| {
                category
                    .as_deref()
                    .map_or(true, |c| p.category.to_lowercase() == c)
            })
            .collect();
        posts.reverse();
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        if let Some(limit) = limit {
            posts.truncate(limit);
        }
        Ok(posts)
    }

    /// Looks up the first post carrying `slug`. Drafts are returned only when
    /// `include_drafts` is set.
    pub fn post_by_slug(&self, slug: &str, include_drafts: bool) -> Result<Option<BlogPost>> {
        let post = self.posts.find(|p| p.slug == slug)?;
        Ok(post.filter(|p| include_drafts || p.is_published()))
    }

    /// Every post including drafts, newest created first.
    pub fn all_posts(&self) -> Result<Vec<BlogPost>> {
        let mut posts = self.posts.all()?;
        posts.reverse();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    pub fn get_post(&self, id: &str) -> Result<Option<BlogPost>> {
        self.posts.get(id)
    }

    pub fn update_post(&self, id: &str, changes: PostChanges) -> Result<Option<BlogPost>> {
        let now = Utc::now();
        self.posts.update(id, |p| p.apply(changes, now))
    }

    pub fn delete_post(&self, id: &str) -> Result<bool> {
        self.posts.remove(id)
    }

    /// Distinct categories across all posts, in order of first appearance.
    pub fn categories(&self) -> Result<Vec<String>> {
        let mut seen = Vec::new();
        for post in self.posts.all()? {
            if !seen.contains(&post.category) {
                seen.push(post.category);
            }
        }
        Ok(seen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PostStatus;

    fn new_post(title: &str, category: &str, status: PostStatus) -> NewBlogPost {
        NewBlogPost {
            title: title.into(),
            slug: crate::validate::slugify(title),
            excerpt: None,
            content: "Body".into(),
            category: category.into(),
            author: "Admin".into(),
            image: "/images/blog/default.jpg".into(),
            status,
        }
    }

    #[test]
    fn published_posts_newest_first() {
        let store = Store::in_memory().unwrap();
        let fresh = store
            .create_post(new_post("Prize Day", "Events", PostStatus::Published))
            .unwrap();
        store
            .create_post(new_post("Secret Draft", "Events", PostStatus::Draft))
            .unwrap();

        let slugs: Vec<_> = store
            .published_posts(None, None)
            .unwrap()
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(
            slugs,
            [
                fresh.slug.as_str(),
                "inter-house-sports-competition-2025",
                "welcome-to-cradle-bridge-schools"
            ]
        );
    }

    #[test]
    fn category_filter_ignores_case_and_limit_truncates() {
        let store = Store::in_memory().unwrap();
        let events = store.published_posts(Some("EVENTS"), None).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].category, "Events");

        assert_eq!(store.published_posts(None, Some(1)).unwrap().len(), 1);
        assert!(store.published_posts(None, Some(0)).unwrap().is_empty());
        assert!(store.published_posts(Some("Sports"), None).unwrap().is_empty());
    }

    #[test]
    fn drafts_hidden_by_slug_unless_requested() {
        let store = Store::in_memory().unwrap();
        store
            .create_post(new_post("Open Day", "Events", PostStatus::Draft))
            .unwrap();
        assert_eq!(store.post_by_slug("open-day", false).unwrap(), None);
        assert!(store.post_by_slug("open-day", true).unwrap().is_some());
        assert_eq!(store.post_by_slug("no-such-post", true).unwrap(), None);
    }

    #[test]
    fn publishing_via_update_sets_published_at() {
        let store = Store::in_memory().unwrap();
        let draft = store
            .create_post(new_post("Open Day", "Events", PostStatus::Draft))
            .unwrap();
        assert_eq!(draft.published_at, None);

        let published = store
            .update_post(
                &draft.id,
                PostChanges {
                    status: Some(PostStatus::Published),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();
        assert!(published.published_at.is_some());
        assert_eq!(published.slug, "open-day");
        assert!(store.post_by_slug("open-day", false).unwrap().is_some());
    }

    #[test]
    fn update_and_delete_missing_post() {
        let store = Store::in_memory().unwrap();
        assert_eq!(store.update_post("404", PostChanges::default()).unwrap(), None);
        assert!(!store.delete_post("404").unwrap());
    }

    #[test]
    fn categories_are_distinct_in_first_seen_order() {
        let store = Store::in_memory().unwrap();
        store
            .create_post(new_post("Term Dates", "Announcements", PostStatus::Draft))
            .unwrap();
        store
            .create_post(new_post("Science Fair", "Academics", PostStatus::Published))
            .unwrap();
        assert_eq!(
            store.categories().unwrap(),
            ["Announcements", "Events", "Academics"]
        );
    }
}
