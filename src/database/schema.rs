/// Tag-list columns shared by `post` and `postfts`, in declaration order.
pub const TAG_LIST_COLUMNS: [&str; 6] = [
    "tag_list",
    "tag_list_general",
    "tag_list_artist",
    "tag_list_character",
    "tag_list_copyright",
    "tag_list_meta",
];

pub const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS tag (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE,
        type INTEGER NOT NULL,
        popularity INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS tag_type ON tag(type);

    CREATE TABLE IF NOT EXISTS post (
        id INTEGER PRIMARY KEY,
        created_at TEXT NOT NULL,
        uploader_id INTEGER NOT NULL,
        source TEXT NOT NULL,
        md5 TEXT,
        parent_id INTEGER,
        has_children INTEGER NOT NULL,
        is_deleted INTEGER NOT NULL,
        is_banned INTEGER NOT NULL,
        pixiv_id INTEGER,
        has_active_children INTEGER NOT NULL,
        bit_flags INTEGER NOT NULL,
        has_large INTEGER NOT NULL,
        has_visible_children INTEGER NOT NULL,

        image_width INTEGER NOT NULL,
        image_height INTEGER NOT NULL,
        file_size INTEGER NOT NULL,
        file_ext TEXT NOT NULL,

        rating INTEGER NOT NULL,
        score INTEGER NOT NULL,
        up_score INTEGER NOT NULL,
        down_score INTEGER NOT NULL,
        fav_count INTEGER NOT NULL,

        file_url TEXT NOT NULL,
        large_file_url TEXT NOT NULL,
        preview_file_url TEXT NOT NULL,

        tag_list TEXT NOT NULL,
        tag_list_general TEXT NOT NULL,
        tag_list_artist TEXT NOT NULL,
        tag_list_character TEXT NOT NULL,
        tag_list_copyright TEXT NOT NULL,
        tag_list_meta TEXT NOT NULL,

        tag_count INTEGER NOT NULL,
        tag_count_general INTEGER NOT NULL,
        tag_count_artist INTEGER NOT NULL,
        tag_count_character INTEGER NOT NULL,
        tag_count_copyright INTEGER NOT NULL,
        tag_count_meta INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS post_rating ON post(rating);
    CREATE INDEX IF NOT EXISTS post_score ON post(score);

    -- rowid of each row equals the id of the post it mirrors
    CREATE VIRTUAL TABLE IF NOT EXISTS postfts USING fts5(
        tag_list,
        tag_list_general,
        tag_list_artist,
        tag_list_character,
        tag_list_copyright,
        tag_list_meta
    );
";

/// Column list for `SELECT`s on `post`, in the order `Post::from_row` reads.
pub const POST_COLUMNS: &str = "id, created_at, uploader_id, source, md5, parent_id, \
    has_children, is_deleted, is_banned, pixiv_id, has_active_children, bit_flags, \
    has_large, has_visible_children, image_width, image_height, file_size, file_ext, \
    rating, score, up_score, down_score, fav_count, file_url, large_file_url, \
    preview_file_url, tag_list, tag_list_general, tag_list_artist, tag_list_character, \
    tag_list_copyright, tag_list_meta, tag_count, tag_count_general, tag_count_artist, \
    tag_count_character, tag_count_copyright, tag_count_meta";

pub const TAG_COLUMNS: &str = "id, name, type, popularity";
