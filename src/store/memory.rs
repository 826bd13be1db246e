//! In-memory doubles of every storage capability, used by tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use time::OffsetDateTime;

use super::{
    users::hash_token, Comment, CommentsRepo, FollowersRepo, NewComment, NewPost, NewUser, Post,
    PostWithMetadata, PostsRepo, Role, RolesRepo, Storage, StoreError, User, UsersRepo,
};
use crate::{auth::password::Password, feed::FeedQuery, feed::SortDirection};

struct Inner {
    next_id: i64,
    clock: OffsetDateTime,
    roles: Vec<Role>,
    users: HashMap<i64, User>,
    invitations: HashMap<String, (i64, OffsetDateTime)>,
    posts: HashMap<i64, Post>,
    comments: HashMap<i64, Comment>,
    /// (follower, followed)
    followers: HashSet<(i64, i64)>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing timestamps so ordering is deterministic.
    fn tick(&mut self) -> OffsetDateTime {
        self.clock += time::Duration::seconds(1);
        self.clock
    }

    fn role(&self, name: &str) -> Role {
        self.roles
            .iter()
            .find(|r| r.name == name)
            .cloned()
            .unwrap_or_default()
    }
}

pub struct MemoryStore {
    inner: Mutex<Inner>,
    user_reads: AtomicUsize,
    fail_roles: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let role = |id: i64, name: &str, level: i32| Role {
            id,
            name: name.into(),
            level,
            description: format!("{} role", name),
        };
        Self {
            inner: Mutex::new(Inner {
                next_id: 100,
                clock: OffsetDateTime::UNIX_EPOCH + time::Duration::days(365 * 50),
                roles: vec![role(1, "user", 1), role(2, "moderator", 2), role(3, "admin", 3)],
                users: HashMap::new(),
                invitations: HashMap::new(),
                posts: HashMap::new(),
                comments: HashMap::new(),
                followers: HashSet::new(),
            }),
            user_reads: AtomicUsize::new(0),
            fail_roles: AtomicBool::new(false),
        }
    }

    pub fn storage(self: &Arc<Self>) -> Storage {
        Storage {
            users: self.clone(),
            roles: self.clone(),
            posts: self.clone(),
            comments: self.clone(),
            followers: self.clone(),
        }
    }

    pub fn insert_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
        role: &str,
        active: bool,
    ) -> i64 {
        let mut pw = Password::default();
        pw.set(password).expect("hash test password");
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let created_at = inner.tick();
        let role = inner.role(role);
        inner.users.insert(
            id,
            User {
                id,
                username: username.into(),
                email: email.into(),
                password: pw,
                created_at,
                is_active: active,
                role_id: role.id,
                role,
            },
        );
        id
    }

    pub fn user_reads(&self) -> usize {
        self.user_reads.load(Ordering::SeqCst)
    }

    pub fn rename_user(&self, id: i64, username: &str) {
        if let Some(u) = self.inner.lock().unwrap().users.get_mut(&id) {
            u.username = username.into();
        }
    }

    pub fn user(&self, id: i64) -> Option<User> {
        self.inner.lock().unwrap().users.get(&id).cloned()
    }

    pub fn post(&self, id: i64) -> Option<Post> {
        self.inner.lock().unwrap().posts.get(&id).cloned()
    }

    pub fn fail_role_lookups(&self, fail: bool) {
        self.fail_roles.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl UsersRepo for MemoryStore {
    async fn get_by_id(&self, id: i64) -> Result<User, StoreError> {
        self.user_reads.fetch_add(1, Ordering::SeqCst);
        self.user(id).ok_or(StoreError::NotFound)
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner
            .users
            .values()
            .find(|u| u.email == email && u.is_active)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create_and_invite(
        &self,
        user: NewUser,
        plain_token: &str,
        invitation_ttl: time::Duration,
    ) -> Result<User, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        if inner.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::DuplicateUsername);
        }
        let id = inner.next_id();
        let created_at = inner.tick();
        let role = inner.role("user");
        let created = User {
            id,
            username: user.username,
            email: user.email,
            password: user.password,
            created_at,
            is_active: false,
            role_id: role.id,
            role,
        };
        inner.users.insert(id, created.clone());
        inner.invitations.insert(
            hash_token(plain_token),
            (id, OffsetDateTime::now_utc() + invitation_ttl),
        );
        Ok(created)
    }

    async fn activate(&self, plain_token: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let (user_id, expiry) = inner
            .invitations
            .get(&hash_token(plain_token))
            .copied()
            .ok_or(StoreError::NotFound)?;
        if expiry <= OffsetDateTime::now_utc() {
            return Err(StoreError::NotFound);
        }
        if let Some(u) = inner.users.get_mut(&user_id) {
            u.is_active = true;
        }
        inner.invitations.retain(|_, (uid, _)| *uid != user_id);
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.invitations.retain(|_, (uid, _)| *uid != id);
        inner.users.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl RolesRepo for MemoryStore {
    async fn get_by_name(&self, name: &str) -> Result<Role, StoreError> {
        if self.fail_roles.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout);
        }
        let inner = self.inner.lock().unwrap();
        inner
            .roles
            .iter()
            .find(|r| r.name == name)
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn create(&self, post: NewPost) -> Result<Post, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.next_id();
        let now = inner.tick();
        let created = Post {
            id,
            user_id: post.user_id,
            title: post.title,
            content: post.content,
            tags: post.tags,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        inner.posts.insert(id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Post, StoreError> {
        self.post(id).ok_or(StoreError::NotFound)
    }

    async fn update(&self, post: &Post) -> Result<Post, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let now = inner.tick();
        let stored = inner
            .posts
            .get_mut(&post.id)
            .filter(|p| p.version == post.version)
            .ok_or(StoreError::VersionConflict)?;
        stored.title = post.title.clone();
        stored.content = post.content.clone();
        stored.tags = post.tags.clone();
        stored.updated_at = now;
        stored.version += 1;
        Ok(stored.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.posts.remove(&id);
        inner.comments.retain(|_, c| c.post_id != id);
        Ok(())
    }

    async fn user_feed(
        &self,
        viewer_id: i64,
        query: &FeedQuery,
    ) -> Result<Vec<PostWithMetadata>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let search = query.search.to_lowercase();
        let mut rows: Vec<PostWithMetadata> = inner
            .posts
            .values()
            .filter(|p| {
                p.user_id == viewer_id || inner.followers.contains(&(viewer_id, p.user_id))
            })
            .filter(|p| {
                p.title.to_lowercase().contains(&search)
                    || p.content.to_lowercase().contains(&search)
            })
            .filter(|p| query.tags.is_empty() || p.tags.iter().any(|t| query.tags.contains(t)))
            .filter(|p| query.since.map_or(true, |s| p.created_at >= s))
            .filter(|p| query.until.map_or(true, |u| p.created_at <= u))
            .map(|p| PostWithMetadata {
                post: p.clone(),
                comments_count: inner.comments.values().filter(|c| c.post_id == p.id).count()
                    as i64,
                username: inner
                    .users
                    .get(&p.user_id)
                    .map(|u| u.username.clone())
                    .unwrap_or_default(),
            })
            .collect();

        rows.sort_by_key(|r| (r.post.created_at, r.post.id));
        if query.sort == SortDirection::Desc {
            rows.reverse();
        }
        Ok(rows
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }
}

#[async_trait]
impl CommentsRepo for MemoryStore {
    async fn create(&self, comment: NewComment) -> Result<Comment, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.posts.contains_key(&comment.post_id) {
            return Err(StoreError::NotFound);
        }
        let id = inner.next_id();
        let created_at = inner.tick();
        let username = inner
            .users
            .get(&comment.user_id)
            .map(|u| u.username.clone())
            .unwrap_or_default();
        let created = Comment {
            id,
            post_id: comment.post_id,
            user_id: comment.user_id,
            content: comment.content,
            created_at,
            username,
        };
        inner.comments.insert(id, created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Comment, StoreError> {
        let inner = self.inner.lock().unwrap();
        inner.comments.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn list_by_post(&self, post_id: i64) -> Result<Vec<Comment>, StoreError> {
        let inner = self.inner.lock().unwrap();
        let mut rows: Vec<Comment> = inner
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn update(&self, comment: &Comment) -> Result<Comment, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let stored = inner
            .comments
            .get_mut(&comment.id)
            .ok_or(StoreError::NotFound)?;
        stored.content = comment.content.clone();
        Ok(stored.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.inner.lock().unwrap().comments.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl FollowersRepo for MemoryStore {
    async fn follow(&self, follower_id: i64, followed_id: i64) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if !inner.users.contains_key(&followed_id) {
            return Err(StoreError::NotFound);
        }
        if !inner.followers.insert((follower_id, followed_id)) {
            return Err(StoreError::AlreadyExists);
        }
        Ok(())
    }

    async fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .followers
            .remove(&(follower_id, followed_id));
        Ok(())
    }
}
