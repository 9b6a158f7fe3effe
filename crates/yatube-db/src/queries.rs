use crate::Database;
use crate::models::{CommentRow, GroupRow, PostRow, UserRow};
use anyhow::{Result, bail};
use rusqlite::{Connection, Row};
use tracing::info;

/// Columns shared by every post listing. Group columns are NULL when the post has none.
const POST_SELECT: &str = "
    SELECT p.id, p.text, p.pub_date, p.author_id, u.username,
           g.id, g.title, g.slug, g.description, p.image,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id)
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN post_groups g ON g.id = p.group_id";

/// Newest first; ties on the timestamp fall back to insertion order.
const POST_ORDER: &str = "ORDER BY p.pub_date DESC, p.id DESC";

/// Result of a follow request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    SelfFollow,
}

impl Database {
    // -- Users --

    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password) VALUES (?1, ?2, ?3)",
                (username, email, password_hash),
            )?;
            let id = conn.last_insert_rowid();
            info!("Created user {} ({})", username, id);
            Ok(id)
        })
    }

    /// Insert unless the username is already registered; `None` when taken.
    pub fn try_create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<i64>> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT INTO users (username, email, password) VALUES (?1, ?2, ?3)
                 ON CONFLICT(username) DO NOTHING",
                (username, email, password_hash),
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            let id = conn.last_insert_rowid();
            info!("Created user {} ({})", username, id);
            Ok(Some(id))
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, email, password, date_joined FROM users WHERE username = ?1",
                [username],
                map_user,
            )
            .optional()
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, email, password, date_joined FROM users WHERE id = ?1",
                [id],
                map_user,
            )
            .optional()
        })
    }

    // -- Groups --

    pub fn create_group(&self, title: &str, slug: &str, description: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO post_groups (title, slug, description) VALUES (?1, ?2, ?3)",
                (title, slug, description),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_group_by_slug(&self, slug: &str) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, title, slug, description FROM post_groups WHERE slug = ?1",
                [slug],
                map_group,
            )
            .optional()
        })
    }

    pub fn get_group_by_id(&self, id: i64) -> Result<Option<GroupRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, title, slug, description FROM post_groups WHERE id = ?1",
                [id],
                map_group,
            )
            .optional()
        })
    }

    pub fn list_groups(&self) -> Result<Vec<GroupRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, title, slug, description FROM post_groups ORDER BY title")?;
            let rows = stmt
                .query_map([], map_group)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Posts --

    pub fn create_post(
        &self,
        author_id: i64,
        text: &str,
        group_id: Option<i64>,
        image: Option<&str>,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO posts (author_id, text, group_id, image) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![author_id, text, group_id, image],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Replaces text, group and image of a post. Returns false if the post does not exist.
    pub fn update_post(
        &self,
        id: i64,
        text: &str,
        group_id: Option<i64>,
        image: Option<&str>,
    ) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE posts SET text = ?2, group_id = ?3, image = ?4 WHERE id = ?1",
                rusqlite::params![id, text, group_id, image],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn get_post(&self, id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            conn.query_row(&format!("{POST_SELECT} WHERE p.id = ?1"), [id], map_post)
                .optional()
        })
    }

    pub fn count_posts(&self) -> Result<u64> {
        self.with_conn(|conn| count(conn, "SELECT COUNT(*) FROM posts", []))
    }

    pub fn list_posts(&self, limit: u32, offset: u64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                &format!("{POST_SELECT} {POST_ORDER} LIMIT ?1 OFFSET ?2"),
                rusqlite::params![limit, offset as i64],
            )
        })
    }

    pub fn count_posts_by_author(&self, author_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            count(conn, "SELECT COUNT(*) FROM posts WHERE author_id = ?1", [author_id])
        })
    }

    pub fn list_posts_by_author(&self, author_id: i64, limit: u32, offset: u64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                &format!("{POST_SELECT} WHERE p.author_id = ?1 {POST_ORDER} LIMIT ?2 OFFSET ?3"),
                rusqlite::params![author_id, limit, offset as i64],
            )
        })
    }

    pub fn count_posts_in_group(&self, group_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            count(conn, "SELECT COUNT(*) FROM posts WHERE group_id = ?1", [group_id])
        })
    }

    pub fn list_posts_in_group(&self, group_id: i64, limit: u32, offset: u64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                &format!("{POST_SELECT} WHERE p.group_id = ?1 {POST_ORDER} LIMIT ?2 OFFSET ?3"),
                rusqlite::params![group_id, limit, offset as i64],
            )
        })
    }

    // -- Feed --

    /// Number of posts written by authors `user_id` follows.
    pub fn count_feed(&self, user_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            count(
                conn,
                "SELECT COUNT(*) FROM posts p
                 JOIN follows f ON f.author_id = p.author_id
                 WHERE f.user_id = ?1",
                [user_id],
            )
        })
    }

    pub fn list_feed(&self, user_id: i64, limit: u32, offset: u64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            query_posts(
                conn,
                &format!(
                    "{POST_SELECT}
                     JOIN follows f ON f.author_id = p.author_id
                     WHERE f.user_id = ?1 {POST_ORDER} LIMIT ?2 OFFSET ?3"
                ),
                rusqlite::params![user_id, limit, offset as i64],
            )
        })
    }

    // -- Comments --

    pub fn create_comment(&self, post_id: i64, author_id: i64, text: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO comments (post_id, author_id, text) VALUES (?1, ?2, ?3)",
                rusqlite::params![post_id, author_id, text],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Comments of a post, oldest first.
    pub fn list_comments(&self, post_id: i64) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.post_id, c.author_id, u.username, c.text, c.created
                 FROM comments c
                 JOIN users u ON u.id = c.author_id
                 WHERE c.post_id = ?1
                 ORDER BY c.created ASC, c.id ASC",
            )?;
            let rows = stmt
                .query_map([post_id], |row| {
                    Ok(CommentRow {
                        id: row.get(0)?,
                        post_id: row.get(1)?,
                        author_id: row.get(2)?,
                        author_username: row.get(3)?,
                        text: row.get(4)?,
                        created: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Follows --

    /// Get-or-create the edge `user_id -> author_id`.
    pub fn follow(&self, user_id: i64, author_id: i64) -> Result<FollowOutcome> {
        if user_id == author_id {
            return Ok(FollowOutcome::SelfFollow);
        }
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO follows (user_id, author_id) VALUES (?1, ?2)",
                [user_id, author_id],
            )?;
            Ok(if inserted > 0 {
                FollowOutcome::Created
            } else {
                FollowOutcome::AlreadyFollowing
            })
        })
    }

    /// Removes the edge. Returns false if there was nothing to remove.
    pub fn unfollow(&self, user_id: i64, author_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM follows WHERE user_id = ?1 AND author_id = ?2",
                [user_id, author_id],
            )?;
            Ok(removed > 0)
        })
    }

    pub fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM follows WHERE user_id = ?1 AND author_id = ?2)",
                [user_id, author_id],
                |row| row.get::<_, bool>(0),
            )?;
            Ok(found)
        })
    }

    /// How many users follow `author_id`.
    pub fn count_followers(&self, author_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            count(conn, "SELECT COUNT(*) FROM follows WHERE author_id = ?1", [author_id])
        })
    }

    /// How many authors `user_id` follows.
    pub fn count_following(&self, user_id: i64) -> Result<u64> {
        self.with_conn(|conn| {
            count(conn, "SELECT COUNT(*) FROM follows WHERE user_id = ?1", [user_id])
        })
    }
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        date_joined: row.get(4)?,
    })
}

fn map_group(row: &Row<'_>) -> rusqlite::Result<GroupRow> {
    Ok(GroupRow {
        id: row.get(0)?,
        title: row.get(1)?,
        slug: row.get(2)?,
        description: row.get(3)?,
    })
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    let group = match row.get::<_, Option<i64>>(5)? {
        Some(id) => Some(GroupRow {
            id,
            title: row.get(6)?,
            slug: row.get(7)?,
            description: row.get(8)?,
        }),
        None => None,
    };

    Ok(PostRow {
        id: row.get(0)?,
        text: row.get(1)?,
        pub_date: row.get(2)?,
        author_id: row.get(3)?,
        author_username: row.get(4)?,
        group,
        image: row.get(9)?,
        comment_count: row.get::<_, i64>(10)?.max(0) as u64,
    })
}

fn query_posts<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<PostRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map_post)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn count<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<u64> {
    let n: i64 = conn.query_row(sql, params, |row| row.get(0))?;
    if n < 0 {
        bail!("negative row count {} from: {}", n, sql);
    }
    Ok(n as u64)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
