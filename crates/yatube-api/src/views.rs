use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;

use yatube_db::models::{CommentRow, GroupRow, PostRow};
use yatube_types::models::{Author, Comment, Group, Post};

use crate::media::MediaStorage;

/// SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS.fff" without timezone;
/// they are UTC.
pub fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").map(|ndt| ndt.and_utc()))
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}': {}", raw, e);
            DateTime::default()
        })
}

pub fn group(row: GroupRow) -> Group {
    Group {
        id: row.id,
        title: row.title,
        slug: row.slug,
        description: row.description,
    }
}

pub fn post(row: PostRow, media: &MediaStorage) -> Post {
    Post {
        id: row.id,
        pub_date: parse_timestamp(&row.pub_date),
        text: row.text,
        author: Author {
            id: row.author_id,
            username: row.author_username,
        },
        group: row.group.map(group),
        image: row.image.as_deref().map(|path| media.url_for(path)),
        comment_count: row.comment_count,
    }
}

pub fn posts(rows: Vec<PostRow>, media: &MediaStorage) -> Vec<Post> {
    rows.into_iter().map(|row| post(row, media)).collect()
}

pub fn comment(row: CommentRow) -> Comment {
    Comment {
        id: row.id,
        created: parse_timestamp(&row.created),
        text: row.text,
        author: Author {
            id: row.author_id,
            username: row.author_username,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_sqlite_millisecond_timestamps() {
        let ts = parse_timestamp("2024-03-05 14:07:09.250");
        assert_eq!((ts.year(), ts.month(), ts.day()), (2024, 3, 5));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (14, 7, 9));
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn parses_second_precision_and_rfc3339() {
        assert_eq!(parse_timestamp("2024-03-05 14:07:09").second(), 9);
        assert_eq!(parse_timestamp("2024-03-05T14:07:09Z").minute(), 7);
    }

    #[test]
    fn corrupt_timestamp_falls_back_to_epoch() {
        assert_eq!(parse_timestamp("yesterday"), DateTime::<Utc>::default());
    }
}
