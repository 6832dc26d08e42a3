//! Media items, their processed files, and the media view that merges the two.

use chrono::{DateTime, FixedOffset, Offset, Utc};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::{params, params_from_iter, Result, Row};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::albums::{Album, PersonLocation, Tag};
use super::{format_timestamp, new_id, Database};
use crate::query::fields::MetadataField;
use crate::query::predicate::{ColumnRef, Comparison, MediaColumn, Operand, Predicate};
use crate::query::sql::{SqlBuilder, MEDIA_VIEW};
use crate::query::Operator;

/// Descriptive metadata. On a media item every field is a user override; on
/// a processed file it is whatever was parsed out of the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub filename: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub label: Option<String>,
    pub location: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub lens: Option<String>,
    pub photographer: Option<String>,
    pub shutter_speed: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub aperture: Option<f64>,
    pub focal_length: Option<f64>,
    pub orientation: Option<i64>,
    pub iso: Option<i64>,
    pub rating: Option<i64>,
    pub taken: Option<DateTime<FixedOffset>>,
    /// Zone the media was taken in. Defaults to the offset of `taken`.
    pub taken_zone: Option<String>,
}

impl Metadata {
    /// Stored value of a field. `taken` is stored in UTC.
    pub fn sql_value(&self, field: MetadataField) -> SqlValue {
        let text = |v: &Option<String>| v.clone().map_or(SqlValue::Null, SqlValue::Text);
        let real = |v: Option<f64>| v.map_or(SqlValue::Null, SqlValue::Real);
        let integer = |v: Option<i64>| v.map_or(SqlValue::Null, SqlValue::Integer);

        match field {
            MetadataField::Filename => text(&self.filename),
            MetadataField::Title => text(&self.title),
            MetadataField::Description => text(&self.description),
            MetadataField::Category => text(&self.category),
            MetadataField::Label => text(&self.label),
            MetadataField::Location => text(&self.location),
            MetadataField::City => text(&self.city),
            MetadataField::State => text(&self.state),
            MetadataField::Country => text(&self.country),
            MetadataField::Make => text(&self.make),
            MetadataField::Model => text(&self.model),
            MetadataField::Lens => text(&self.lens),
            MetadataField::Photographer => text(&self.photographer),
            MetadataField::ShutterSpeed => text(&self.shutter_speed),
            MetadataField::Latitude => real(self.latitude),
            MetadataField::Longitude => real(self.longitude),
            MetadataField::Altitude => real(self.altitude),
            MetadataField::Aperture => real(self.aperture),
            MetadataField::FocalLength => real(self.focal_length),
            MetadataField::Orientation => integer(self.orientation),
            MetadataField::Iso => integer(self.iso),
            MetadataField::Rating => integer(self.rating),
            MetadataField::Taken => self
                .taken
                .map_or(SqlValue::Null, |t| SqlValue::Text(format_timestamp(&t.with_timezone(&Utc)))),
        }
    }

    fn zone_value(&self) -> SqlValue {
        match (&self.taken_zone, self.taken) {
            (Some(zone), _) => SqlValue::Text(zone.clone()),
            (None, Some(taken)) => SqlValue::Text(taken.offset().to_string()),
            (None, None) => SqlValue::Null,
        }
    }

    /// Values in the order of [`metadata_columns`].
    fn values(&self) -> Vec<SqlValue> {
        let mut values: Vec<SqlValue> = MetadataField::ALL
            .iter()
            .map(|f| self.sql_value(*f))
            .collect();
        values.push(self.zone_value());
        values
    }
}

fn metadata_columns() -> Vec<&'static str> {
    let mut columns: Vec<&'static str> = MetadataField::ALL.iter().map(|f| f.column()).collect();
    columns.push("taken_zone");
    columns
}

/// A processed file to attach to a media item.
#[derive(Debug, Clone, Default)]
pub struct NewFile {
    pub file_name: String,
    pub file_size: i64,
    pub width: i64,
    pub height: i64,
    pub mimetype: String,
    pub duration: Option<f64>,
    pub frame_rate: Option<f64>,
    pub bit_rate: Option<f64>,
    pub metadata: Metadata,
}

/// The current file of a media item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    pub id: String,
    pub uploaded: DateTime<Utc>,
    pub version: i64,
    pub file_name: String,
    pub file_size: i64,
    pub width: i64,
    pub height: i64,
    pub mimetype: String,
    pub duration: Option<f64>,
    pub frame_rate: Option<f64>,
    pub bit_rate: Option<f64>,
}

/// One row of the media view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaViewRow {
    pub id: String,
    pub catalog: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// `None` until the media has been processed.
    pub file: Option<FileInfo>,
    #[serde(flatten)]
    pub metadata: Metadata,
    pub albums: Vec<Album>,
    pub tags: Vec<Tag>,
    pub people: Vec<PersonLocation>,
}

// ============================================================================
// Media view
// ============================================================================

/// Write the `WITH` clause defining `media_view` for one catalog.
///
/// The current file of a media item is its latest upload, highest version
/// first. Each metadata column prefers the media's override over the file's
/// value, except `taken` and `taken_zone` which always come from the same
/// source.
pub fn media_view(builder: &mut SqlBuilder, catalog: &str) {
    builder.push(
        r#"WITH current_file AS (
    SELECT * FROM (
        SELECT media_file.*, ROW_NUMBER() OVER (
            PARTITION BY media_file.media
            ORDER BY media_file.uploaded DESC, media_file.version DESC
        ) AS file_rank
        FROM media_file
    ) WHERE file_rank = 1
),
"#,
    );

    builder.push(&format!(
        r#"{MEDIA_VIEW} AS (
    SELECT
        media_item.id AS id,
        media_item.catalog AS catalog,
        media_item.created AS created,
        MAX(media_item.updated, COALESCE(current_file.uploaded, media_item.updated)) AS updated,
        current_file.id AS file_id,
        current_file.uploaded AS file_uploaded,
        current_file.version AS file_version,
        current_file.file_name AS file_name,
        current_file.file_size AS file_size,
        current_file.width AS file_width,
        current_file.height AS file_height,
        current_file.mimetype AS file_mimetype,
        current_file.duration AS file_duration,
        current_file.frame_rate AS file_frame_rate,
        current_file.bit_rate AS file_bit_rate,
"#
    ));

    for field in MetadataField::ALL {
        if field == MetadataField::Taken {
            continue;
        }
        let column = field.column();
        builder.push(&format!(
            "        COALESCE(media_item.{column}, current_file.{column}) AS {column},\n"
        ));
    }

    builder.push(
        r#"        CASE WHEN media_item.taken IS NOT NULL THEN media_item.taken ELSE current_file.taken END AS taken,
        CASE WHEN media_item.taken IS NOT NULL THEN media_item.taken_zone ELSE current_file.taken_zone END AS taken_zone
    FROM media_item
    LEFT JOIN current_file ON current_file.media = media_item.id
    WHERE media_item.deleted = 0 AND media_item.catalog = "#,
    );
    builder.bind(catalog.to_string());
    builder.push("\n)\n");
}

/// Select view rows together with their related entities.
const SELECT_ROWS: &str = r#"SELECT media_view.*,
    COALESCE(album_agg.albums, '[]') AS albums,
    COALESCE(tag_agg.tags, '[]') AS tags,
    COALESCE(person_agg.people, '[]') AS people
FROM media_view
LEFT JOIN (
    SELECT media_album.media AS media,
        json_group_array(json_object(
            'id', album.id, 'catalog', album.catalog, 'parent', album.parent, 'name', album.name
        )) AS albums
    FROM media_album JOIN album ON album.id = media_album.album
    GROUP BY media_album.media
) AS album_agg ON album_agg.media = media_view.id
LEFT JOIN (
    SELECT media_tag.media AS media,
        json_group_array(json_object(
            'id', tag.id, 'catalog', tag.catalog, 'parent', tag.parent, 'name', tag.name
        )) AS tags
    FROM media_tag JOIN tag ON tag.id = media_tag.tag
    GROUP BY media_tag.media
) AS tag_agg ON tag_agg.media = media_view.id
LEFT JOIN (
    SELECT media_person.media AS media,
        json_group_array(json_object(
            'id', person.id, 'catalog', person.catalog, 'name', person.name,
            'location', json(media_person.location)
        )) AS people
    FROM media_person JOIN person ON person.id = media_person.person
    GROUP BY media_person.media
) AS person_agg ON person_agg.media = media_view.id
"#;

fn json_column<T: DeserializeOwned>(row: &Row, column: &str) -> Result<T> {
    let idx = row.as_ref().column_index(column)?;
    let text: String = row.get(idx)?;
    serde_json::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn optional_timestamp(row: &Row, column: &str) -> Result<Option<DateTime<Utc>>> {
    let idx = row.as_ref().column_index(column)?;
    let text: Option<String> = row.get(idx)?;
    text.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

fn timestamp(row: &Row, column: &str) -> Result<DateTime<Utc>> {
    optional_timestamp(row, column)?.ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(
            row.as_ref().column_index(column).unwrap_or_default(),
            column.to_string(),
            Type::Null,
        )
    })
}

fn metadata_from_row(row: &Row) -> Result<Metadata> {
    let taken_zone: Option<String> = row.get("taken_zone")?;
    let taken = optional_timestamp(row, "taken")?.map(|t| localize(t, taken_zone.as_deref()));

    Ok(Metadata {
        filename: row.get("filename")?,
        title: row.get("title")?,
        description: row.get("description")?,
        category: row.get("category")?,
        label: row.get("label")?,
        location: row.get("location")?,
        city: row.get("city")?,
        state: row.get("state")?,
        country: row.get("country")?,
        make: row.get("make")?,
        model: row.get("model")?,
        lens: row.get("lens")?,
        photographer: row.get("photographer")?,
        shutter_speed: row.get("shutter_speed")?,
        latitude: row.get("latitude")?,
        longitude: row.get("longitude")?,
        altitude: row.get("altitude")?,
        aperture: row.get("aperture")?,
        focal_length: row.get("focal_length")?,
        orientation: row.get("orientation")?,
        iso: row.get("iso")?,
        rating: row.get("rating")?,
        taken,
        taken_zone,
    })
}

fn media_row(row: &Row) -> Result<MediaViewRow> {
    let file = match row.get::<_, Option<String>>("file_id")? {
        Some(id) => Some(FileInfo {
            id,
            uploaded: timestamp(row, "file_uploaded")?,
            version: row.get("file_version")?,
            file_name: row.get("file_name")?,
            file_size: row.get("file_size")?,
            width: row.get("file_width")?,
            height: row.get("file_height")?,
            mimetype: row.get("file_mimetype")?,
            duration: row.get("file_duration")?,
            frame_rate: row.get("file_frame_rate")?,
            bit_rate: row.get("file_bit_rate")?,
        }),
        None => None,
    };

    let mut albums: Vec<Album> = json_column(row, "albums")?;
    albums.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    let mut tags: Vec<Tag> = json_column(row, "tags")?;
    tags.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
    let mut people: Vec<PersonLocation> = json_column(row, "people")?;
    people.sort_by(|a, b| a.person.name.cmp(&b.person.name).then_with(|| a.person.id.cmp(&b.person.id)));

    Ok(MediaViewRow {
        id: row.get("id")?,
        catalog: row.get("catalog")?,
        created: timestamp(row, "created")?,
        updated: timestamp(row, "updated")?,
        file,
        metadata: metadata_from_row(row)?,
        albums,
        tags,
        people,
    })
}

// ============================================================================
// Zones
// ============================================================================

/// Parse a recorded zone: `UTC`, `Z`, `+HH:MM`, `-HHMM` or `UTC+H[:MM]`.
pub fn parse_zone(zone: &str) -> Option<FixedOffset> {
    let zone = zone.trim();
    if zone.eq_ignore_ascii_case("utc") || zone == "Z" {
        return FixedOffset::east_opt(0);
    }

    let offset = zone.strip_prefix("UTC").unwrap_or(zone);
    let (sign, rest) = match offset.chars().next()? {
        '+' => (1, &offset[1..]),
        '-' => (-1, &offset[1..]),
        _ => return None,
    };
    // ASCII digits and colons only, so splitting by byte is safe.
    if !rest.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return None;
    }

    let (hours, minutes) = match rest.split_once(':') {
        Some(parts) => parts,
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes >= 60 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Express a stored UTC instant in the zone it was recorded in. Unknown or
/// missing zones leave it in UTC.
pub fn localize(taken: DateTime<Utc>, zone: Option<&str>) -> DateTime<FixedOffset> {
    let offset = zone.and_then(parse_zone).unwrap_or_else(|| Utc.fix());
    taken.with_timezone(&offset)
}

impl Database {
    // ========================================================================
    // Media ingestion
    // ========================================================================

    pub fn create_media(&self, catalog: &str, metadata: &Metadata) -> Result<String> {
        let id = new_id("M");
        let now = format_timestamp(&Utc::now());
        let columns = metadata_columns();
        let sql = format!(
            "INSERT INTO media_item (id, catalog, created, updated, {}) VALUES (?, ?, ?, ?, {})",
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        );

        let mut values = vec![
            SqlValue::Text(id.clone()),
            SqlValue::Text(catalog.to_string()),
            SqlValue::Text(now.clone()),
            SqlValue::Text(now),
        ];
        values.extend(metadata.values());
        self.conn.execute(&sql, params_from_iter(values.iter()))?;

        tracing::debug!(media = %id, catalog, "Created media");
        Ok(id)
    }

    /// Replace the overrides of a media item. Returns false if it doesn't
    /// exist or was deleted.
    pub fn update_media_metadata(&self, media: &str, metadata: &Metadata) -> Result<bool> {
        let assignments: Vec<String> = metadata_columns()
            .iter()
            .map(|c| format!("{c} = ?"))
            .collect();
        let sql = format!(
            "UPDATE media_item SET {}, updated = ? WHERE id = ? AND deleted = 0",
            assignments.join(", ")
        );

        let mut values = metadata.values();
        values.push(SqlValue::Text(format_timestamp(&Utc::now())));
        values.push(SqlValue::Text(media.to_string()));
        let updated = self.conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(updated > 0)
    }

    /// Record a processed file. Its version is one more than the media's
    /// latest.
    pub fn add_media_file(&self, media: &str, file: &NewFile, uploaded: DateTime<Utc>) -> Result<String> {
        let id = new_id("F");
        let version: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM media_file WHERE media = ?",
            [media],
            |row| row.get(0),
        )?;

        let columns = metadata_columns();
        let sql = format!(
            r#"INSERT INTO media_file (
                id, media, uploaded, version, file_name, file_size, width, height,
                mimetype, duration, frame_rate, bit_rate, {}
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, {})"#,
            columns.join(", "),
            vec!["?"; columns.len()].join(", ")
        );

        let mut values = vec![
            SqlValue::Text(id.clone()),
            SqlValue::Text(media.to_string()),
            SqlValue::Text(format_timestamp(&uploaded)),
            SqlValue::Integer(version),
            SqlValue::Text(file.file_name.clone()),
            SqlValue::Integer(file.file_size),
            SqlValue::Integer(file.width),
            SqlValue::Integer(file.height),
            SqlValue::Text(file.mimetype.clone()),
            file.duration.map_or(SqlValue::Null, SqlValue::Real),
            file.frame_rate.map_or(SqlValue::Null, SqlValue::Real),
            file.bit_rate.map_or(SqlValue::Null, SqlValue::Real),
        ];
        values.extend(file.metadata.values());
        self.conn.execute(&sql, params_from_iter(values.iter()))?;

        tracing::debug!(media, file = %id, version, "Added media file");
        Ok(id)
    }

    /// Soft delete. The media disappears from the view but keeps its rows.
    pub fn delete_media(&self, media: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "UPDATE media_item SET deleted = 1, updated = ? WHERE id = ? AND deleted = 0",
            params![format_timestamp(&Utc::now()), media],
        )?;
        Ok(deleted > 0)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Rows of the catalog's media view matching `predicate`, most recently
    /// taken first.
    pub fn query_media(&self, catalog: &str, predicate: &Predicate) -> Result<Vec<MediaViewRow>> {
        let mut builder = SqlBuilder::new();
        media_view(&mut builder, catalog);
        builder.push(SELECT_ROWS);
        builder.push("WHERE ");
        builder.predicate(predicate);
        builder.push(" ORDER BY COALESCE(media_view.taken, media_view.created) DESC, media_view.id");

        let (sql, values) = builder.into_parts();
        tracing::debug!(sql = %sql, params = ?values, "Querying media view");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), media_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_media(&self, catalog: &str, id: &str) -> Result<Option<MediaViewRow>> {
        let predicate = Predicate::Compare(Comparison {
            column: ColumnRef::Media(MediaColumn::Id),
            modifier: None,
            operator: Operator::Equal,
            operand: Some(Operand::Text(id.to_string())),
            inverted: false,
        });
        Ok(self.query_media(catalog, &predicate)?.into_iter().next())
    }
}
