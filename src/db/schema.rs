pub const SCHEMA: &str = r#"
-- Users and the catalogs they can see
CREATE TABLE IF NOT EXISTS user (
    email TEXT PRIMARY KEY,
    name TEXT,
    created TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS catalog (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS user_catalog (
    user TEXT NOT NULL,
    catalog TEXT NOT NULL,
    writable INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (user, catalog),
    FOREIGN KEY (user) REFERENCES user(email) ON DELETE CASCADE,
    FOREIGN KEY (catalog) REFERENCES catalog(id) ON DELETE CASCADE
);

-- Hierarchical albums and tags, flat people
CREATE TABLE IF NOT EXISTS album (
    id TEXT PRIMARY KEY,
    catalog TEXT NOT NULL,
    parent TEXT,
    name TEXT NOT NULL,
    FOREIGN KEY (catalog) REFERENCES catalog(id) ON DELETE CASCADE,
    FOREIGN KEY (parent) REFERENCES album(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_album_parent ON album(parent);

CREATE TABLE IF NOT EXISTS tag (
    id TEXT PRIMARY KEY,
    catalog TEXT NOT NULL,
    parent TEXT,
    name TEXT NOT NULL,
    FOREIGN KEY (catalog) REFERENCES catalog(id) ON DELETE CASCADE,
    FOREIGN KEY (parent) REFERENCES tag(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_tag_parent ON tag(parent);

CREATE TABLE IF NOT EXISTS person (
    id TEXT PRIMARY KEY,
    catalog TEXT NOT NULL,
    name TEXT NOT NULL,
    FOREIGN KEY (catalog) REFERENCES catalog(id) ON DELETE CASCADE
);

-- Media items: user-editable metadata overriding whatever the files carry
CREATE TABLE IF NOT EXISTS media_item (
    id TEXT PRIMARY KEY,
    catalog TEXT NOT NULL,
    created TEXT NOT NULL,
    updated TEXT NOT NULL,
    deleted INTEGER NOT NULL DEFAULT 0,

    filename TEXT,
    title TEXT,
    description TEXT,
    category TEXT,
    label TEXT,
    location TEXT,
    city TEXT,
    state TEXT,
    country TEXT,
    make TEXT,
    model TEXT,
    lens TEXT,
    photographer TEXT,
    shutter_speed TEXT,
    latitude REAL,
    longitude REAL,
    altitude REAL,
    aperture REAL,
    focal_length REAL,
    orientation INTEGER,
    iso INTEGER,
    rating INTEGER,
    taken TEXT,            -- UTC instant
    taken_zone TEXT,       -- Offset the photo was taken in

    FOREIGN KEY (catalog) REFERENCES catalog(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_media_item_catalog ON media_item(catalog);

-- Processed files: one row per upload/reprocess of a media item
CREATE TABLE IF NOT EXISTS media_file (
    id TEXT PRIMARY KEY,
    media TEXT NOT NULL,
    uploaded TEXT NOT NULL,
    version INTEGER NOT NULL DEFAULT 1,

    file_name TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    width INTEGER NOT NULL,
    height INTEGER NOT NULL,
    mimetype TEXT NOT NULL,
    duration REAL,
    frame_rate REAL,
    bit_rate REAL,

    filename TEXT,
    title TEXT,
    description TEXT,
    category TEXT,
    label TEXT,
    location TEXT,
    city TEXT,
    state TEXT,
    country TEXT,
    make TEXT,
    model TEXT,
    lens TEXT,
    photographer TEXT,
    shutter_speed TEXT,
    latitude REAL,
    longitude REAL,
    altitude REAL,
    aperture REAL,
    focal_length REAL,
    orientation INTEGER,
    iso INTEGER,
    rating INTEGER,
    taken TEXT,
    taken_zone TEXT,

    FOREIGN KEY (media) REFERENCES media_item(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_media_file_media ON media_file(media, uploaded, version);

-- Links between media and albums, tags and people
CREATE TABLE IF NOT EXISTS media_album (
    catalog TEXT NOT NULL,
    media TEXT NOT NULL,
    album TEXT NOT NULL,
    PRIMARY KEY (media, album),
    FOREIGN KEY (media) REFERENCES media_item(id) ON DELETE CASCADE,
    FOREIGN KEY (album) REFERENCES album(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_media_album_album ON media_album(album);

CREATE TABLE IF NOT EXISTS media_tag (
    catalog TEXT NOT NULL,
    media TEXT NOT NULL,
    tag TEXT NOT NULL,
    PRIMARY KEY (media, tag),
    FOREIGN KEY (media) REFERENCES media_item(id) ON DELETE CASCADE,
    FOREIGN KEY (tag) REFERENCES tag(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_media_tag_tag ON media_tag(tag);

CREATE TABLE IF NOT EXISTS media_person (
    catalog TEXT NOT NULL,
    media TEXT NOT NULL,
    person TEXT NOT NULL,
    location TEXT,         -- JSON rectangle, NULL when unknown
    PRIMARY KEY (media, person),
    FOREIGN KEY (media) REFERENCES media_item(id) ON DELETE CASCADE,
    FOREIGN KEY (person) REFERENCES person(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_media_person_person ON media_person(person);

-- Saved searches
CREATE TABLE IF NOT EXISTS saved_search (
    id TEXT PRIMARY KEY,
    catalog TEXT NOT NULL,
    name TEXT NOT NULL,
    shared INTEGER NOT NULL DEFAULT 0,
    query TEXT NOT NULL,   -- JSON query
    FOREIGN KEY (catalog) REFERENCES catalog(id) ON DELETE CASCADE
);
"#;
