//! Section-tagged save file.
//!
//! The save file is a line-oriented document. `<Tag arg…` opens a section,
//! `>Tag` closes it, and sections nest. Every other line is an entry of the
//! innermost open section. The map is stored as
//!
//! ```text
//! <Map 120 80
//! <Layer 0
//! 80000209800002098000020b…   one row per line, 8 hex digits per tile
//! >Layer
//! <Layer 1
//! …
//! >Layer
//! >Map
//! ```
//!
//! followed by `Spawners`, `Player` and `Generated` sections. Writing a
//! section replaces the section with the same tag in place, or appends it.

use std::{
    fmt::Write as _,
    fs, io,
    path::{Path, PathBuf},
};

use castaway_core::{CellCoord, Layer, PlayerRecord, Spawner, Tile, LAYER_COUNT};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{Grid, Map};

/// Tag of the map section.
pub const MAP_TAG: &str = "Map";
/// Tag of a layer sub-section inside the map section.
pub const LAYER_TAG: &str = "Layer";
/// Tag of the spawner list section.
pub const SPAWNERS_TAG: &str = "Spawners";
/// Tag of the player section.
pub const PLAYER_TAG: &str = "Player";
/// Tag of the marker written once generation has fully completed.
pub const GENERATED_TAG: &str = "Generated";

const SPAWNER_ENTRY: &str = "Spawner";
const POSITION_ENTRY: &str = "Position";
const TILE_DIGITS: usize = 8;

/// Errors raised while reading or writing the save file.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The file could not be read or written.
    #[error("failed to access save file {path}: {source}")]
    Io {
        /// File that was being accessed.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// An opening line carried no tag.
    #[error("line {line}: section opened without a tag")]
    EmptyTag {
        /// One-based line number.
        line: usize,
    },
    /// A closing tag did not match the innermost open section.
    #[error("line {line}: `>{found}` closes section `{expected}`")]
    MismatchedClose {
        /// One-based line number.
        line: usize,
        /// Tag of the innermost open section.
        expected: String,
        /// Tag found on the closing line.
        found: String,
    },
    /// A closing tag appeared while no section was open.
    #[error("line {line}: `>{tag}` closes nothing")]
    UnexpectedClose {
        /// One-based line number.
        line: usize,
        /// Tag found on the closing line.
        tag: String,
    },
    /// Content appeared outside of every section.
    #[error("line {line}: content outside of any section")]
    StrayContent {
        /// One-based line number.
        line: usize,
    },
    /// The file ended while a section was still open.
    #[error("section `{tag}` is never closed")]
    Unclosed {
        /// Tag of the unterminated section.
        tag: String,
    },
    /// A section is structurally sound but its content is invalid.
    #[error("section `{tag}` is malformed: {reason}")]
    Malformed {
        /// Tag of the offending section.
        tag: &'static str,
        /// Human readable description of the defect.
        reason: String,
    },
}

impl PersistError {
    fn malformed(tag: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            tag,
            reason: reason.into(),
        }
    }
}

/// Line or nested section contained in a section body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    /// Raw content line.
    Line(String),
    /// Nested section.
    Section(Section),
}

/// A tagged block of the save document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Section {
    tag: String,
    args: Vec<String>,
    body: Vec<Entry>,
}

impl Section {
    /// Creates an empty section with the provided tag and header arguments.
    #[must_use]
    pub fn new(tag: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            tag: tag.into(),
            args,
            body: Vec::new(),
        }
    }

    /// Tag naming the section.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Header arguments following the tag on the opening line.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Lines and nested sections, in file order.
    #[must_use]
    pub fn body(&self) -> &[Entry] {
        &self.body
    }

    /// Appends a content line.
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.body.push(Entry::Line(line.into()));
    }

    /// Appends a nested section.
    pub fn push_section(&mut self, section: Section) {
        self.body.push(Entry::Section(section));
    }

    fn render_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }
        out.push('\n');
        for entry in &self.body {
            match entry {
                Entry::Line(line) => {
                    out.push_str(line);
                    out.push('\n');
                }
                Entry::Section(section) => section.render_into(out),
            }
        }
        out.push('>');
        out.push_str(&self.tag);
        out.push('\n');
    }
}

/// In-memory form of the whole save file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveDocument {
    sections: Vec<Section>,
}

impl SaveDocument {
    /// Parses the textual form, validating that every tag is balanced.
    pub fn parse(text: &str) -> Result<Self, PersistError> {
        let mut sections = Vec::new();
        let mut open: Vec<Section> = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line_number = index + 1;
            let line = raw.trim_end();
            if line.is_empty() {
                continue;
            }

            if let Some(header) = line.strip_prefix('<') {
                let mut tokens = header.split_whitespace();
                let tag = tokens
                    .next()
                    .ok_or(PersistError::EmptyTag { line: line_number })?;
                open.push(Section::new(tag, tokens.map(str::to_owned).collect()));
            } else if let Some(tag) = line.strip_prefix('>') {
                let tag = tag.trim();
                let section = open.pop().ok_or_else(|| PersistError::UnexpectedClose {
                    line: line_number,
                    tag: tag.to_owned(),
                })?;
                if section.tag != tag {
                    return Err(PersistError::MismatchedClose {
                        line: line_number,
                        expected: section.tag,
                        found: tag.to_owned(),
                    });
                }
                match open.last_mut() {
                    Some(parent) => parent.push_section(section),
                    None => sections.push(section),
                }
            } else {
                let parent = open
                    .last_mut()
                    .ok_or(PersistError::StrayContent { line: line_number })?;
                parent.push_line(line);
            }
        }

        if let Some(section) = open.pop() {
            return Err(PersistError::Unclosed { tag: section.tag });
        }

        Ok(Self { sections })
    }

    /// Serialises the document back into its textual form.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.sections {
            section.render_into(&mut out);
        }
        out
    }

    /// First top-level section with the provided tag.
    #[must_use]
    pub fn section(&self, tag: &str) -> Option<&Section> {
        self.sections.iter().find(|section| section.tag == tag)
    }

    /// Replaces the top-level section carrying the same tag, or appends it.
    pub fn upsert(&mut self, section: Section) {
        match self
            .sections
            .iter_mut()
            .find(|existing| existing.tag == section.tag)
        {
            Some(existing) => *existing = section,
            None => self.sections.push(section),
        }
    }

    /// Removes every top-level section with the provided tag.
    pub fn remove(&mut self, tag: &str) {
        self.sections.retain(|section| section.tag != tag);
    }

    /// Top-level sections in file order.
    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }
}

/// Handle on the save file stored at a fixed path.
#[derive(Clone, Debug)]
pub struct SaveFile {
    path: PathBuf,
}

impl SaveFile {
    /// Creates a handle; the file itself is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the save file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reports whether a complete `<tag` … `>tag` pair exists in the file.
    ///
    /// This is a read-only line scan; it does not validate the rest of the
    /// document. A missing file simply has no sections.
    pub fn exists(&self, tag: &str) -> Result<bool, PersistError> {
        let Some(text) = self.read_text()? else {
            return Ok(false);
        };

        let mut opened = false;
        for line in text.lines() {
            let line = line.trim_end();
            if let Some(header) = line.strip_prefix('<') {
                if header.split_whitespace().next() == Some(tag) {
                    opened = true;
                }
            } else if let Some(closing) = line.strip_prefix('>') {
                if opened && closing.trim() == tag {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Reads and parses the whole document. A missing file yields an empty document.
    pub fn read(&self) -> Result<SaveDocument, PersistError> {
        match self.read_text()? {
            Some(text) => SaveDocument::parse(&text),
            None => Ok(SaveDocument::default()),
        }
    }

    /// Writes the whole document through a sibling temporary file.
    pub fn write(&self, document: &SaveDocument) -> Result<(), PersistError> {
        let temporary = self.path.with_extension("tmp");
        fs::write(&temporary, document.render()).map_err(|source| self.io_error(source))?;
        fs::rename(&temporary, &self.path).map_err(|source| self.io_error(source))?;
        debug!(path = %self.path.display(), sections = document.sections().len(), "save_written");
        Ok(())
    }

    /// Deletes the save file. Succeeds when there is nothing to delete.
    pub fn remove(&self) -> Result<(), PersistError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(self.io_error(source)),
        }
    }

    /// Loads the map section.
    ///
    /// Returns `Ok(None)` when no map was saved and `Err` when the section
    /// exists but cannot be decoded.
    pub fn load_map(&self) -> Result<Option<Map>, PersistError> {
        self.read()?.section(MAP_TAG).map(decode_map).transpose()
    }

    /// Stores the map, replacing any previously saved map.
    pub fn save_map(&self, map: &Map) -> Result<(), PersistError> {
        self.update(|document| document.upsert(encode_map(map)))
    }

    /// Loads the spawner list, `Ok(None)` when none was saved.
    pub fn load_spawners(&self) -> Result<Option<Vec<Spawner>>, PersistError> {
        self.read()?
            .section(SPAWNERS_TAG)
            .map(decode_spawners)
            .transpose()
    }

    /// Stores the spawner list, replacing any previously saved list.
    pub fn save_spawners(&self, spawners: &[Spawner]) -> Result<(), PersistError> {
        self.update(|document| document.upsert(encode_spawners(spawners)))
    }

    /// Loads the player record, `Ok(None)` when none was saved.
    pub fn load_player(&self) -> Result<Option<PlayerRecord>, PersistError> {
        self.read()?
            .section(PLAYER_TAG)
            .map(decode_player)
            .transpose()
    }

    /// Stores the player record, replacing any previously saved record.
    pub fn save_player(&self, player: &PlayerRecord) -> Result<(), PersistError> {
        self.update(|document| document.upsert(encode_player(player)))
    }

    /// Stores a newly generated island in place of whatever the file held.
    ///
    /// The previous completion marker and player record belong to the old
    /// island and are dropped, so a partial map is never mistaken for a
    /// finished one. A file that no longer parses is discarded rather than
    /// blocking the write.
    pub fn replace_island(&self, map: &Map, spawners: &[Spawner]) -> Result<(), PersistError> {
        let mut document = match self.read() {
            Ok(document) => document,
            Err(error @ PersistError::Io { .. }) => return Err(error),
            Err(error) => {
                warn!(path = %self.path.display(), error = %error, "save_discarded");
                SaveDocument::default()
            }
        };

        document.remove(GENERATED_TAG);
        document.remove(PLAYER_TAG);
        document.upsert(encode_map(map));
        document.upsert(encode_spawners(spawners));
        self.write(&document)
    }

    /// Records that generation ran to completion.
    pub fn mark_generated(&self) -> Result<(), PersistError> {
        self.update(|document| document.upsert(Section::new(GENERATED_TAG, Vec::new())))
    }

    /// Reports whether a finished map is stored: the completion marker and the map section.
    pub fn is_generated(&self) -> Result<bool, PersistError> {
        Ok(self.exists(GENERATED_TAG)? && self.exists(MAP_TAG)?)
    }

    fn update(&self, edit: impl FnOnce(&mut SaveDocument)) -> Result<(), PersistError> {
        let mut document = self.read()?;
        edit(&mut document);
        self.write(&document)
    }

    fn read_text(&self) -> Result<Option<String>, PersistError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => Ok(Some(text)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(self.io_error(source)),
        }
    }

    fn io_error(&self, source: io::Error) -> PersistError {
        PersistError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

/// Encodes a map as a `Map` section with one `Layer` sub-section per layer.
#[must_use]
pub fn encode_map(map: &Map) -> Section {
    let mut section = Section::new(
        MAP_TAG,
        vec![map.width().to_string(), map.height().to_string()],
    );

    for layer in Layer::ALL {
        let mut layer_section = Section::new(LAYER_TAG, vec![layer.index().to_string()]);
        for row in map.layer(layer).rows() {
            let mut line = String::with_capacity(row.len() * TILE_DIGITS);
            for tile in row {
                let _ = write!(line, "{:08x}", tile.to_bits());
            }
            layer_section.push_line(line);
        }
        section.push_section(layer_section);
    }

    section
}

/// Decodes a `Map` section, rejecting wrong sizes, duplicate or missing layers
/// and invalid tile words.
pub fn decode_map(section: &Section) -> Result<Map, PersistError> {
    let [width, height] = parse_args::<2>(MAP_TAG, section.args())?;
    let mut layers: [Option<Grid>; LAYER_COUNT] = [None, None];

    for entry in section.body() {
        let Entry::Section(layer_section) = entry else {
            return Err(PersistError::malformed(MAP_TAG, "unexpected content line"));
        };
        if layer_section.tag() != LAYER_TAG {
            return Err(PersistError::malformed(
                MAP_TAG,
                format!("unexpected sub-section `{}`", layer_section.tag()),
            ));
        }

        let [index] = parse_args::<1>(LAYER_TAG, layer_section.args())?;
        let layer = Layer::from_index(index as usize)
            .ok_or_else(|| PersistError::malformed(LAYER_TAG, format!("unknown layer {index}")))?;
        let slot = &mut layers[layer.index()];
        if slot.is_some() {
            return Err(PersistError::malformed(
                LAYER_TAG,
                format!("layer {index} stored twice"),
            ));
        }
        *slot = Some(decode_layer(layer_section, width, height)?);
    }

    let [Some(ground), Some(decoration)] = layers else {
        return Err(PersistError::malformed(MAP_TAG, "missing layer"));
    };

    Map::from_layers(ground, decoration)
        .ok_or_else(|| PersistError::malformed(MAP_TAG, "layer sizes differ"))
}

fn decode_layer(section: &Section, width: u32, height: u32) -> Result<Grid, PersistError> {
    let row_digits = (width as usize)
        .checked_mul(TILE_DIGITS)
        .ok_or_else(|| PersistError::malformed(MAP_TAG, format!("width {width} is too large")))?;
    if section.body().len() != height as usize {
        return Err(PersistError::malformed(
            LAYER_TAG,
            format!("{} rows stored, expected {height}", section.body().len()),
        ));
    }
    // Grown from the rows actually read, never from the header.
    let mut tiles = Vec::new();

    for entry in section.body() {
        let Entry::Line(line) = entry else {
            return Err(PersistError::malformed(LAYER_TAG, "nested section in layer"));
        };
        if line.len() != row_digits || !line.is_ascii() {
            return Err(PersistError::malformed(
                LAYER_TAG,
                format!("row has {} characters, expected {row_digits}", line.len()),
            ));
        }

        for start in (0..line.len()).step_by(TILE_DIGITS) {
            let word = &line[start..start + TILE_DIGITS];
            let bits = u32::from_str_radix(word, 16).map_err(|_| {
                PersistError::malformed(LAYER_TAG, format!("`{word}` is not a hex tile"))
            })?;
            let tile = Tile::from_bits(bits).ok_or_else(|| {
                PersistError::malformed(LAYER_TAG, format!("`{word}` is not a valid tile"))
            })?;
            tiles.push(tile);
        }
    }

    Grid::from_tiles(width, height, tiles)
        .ok_or_else(|| PersistError::malformed(LAYER_TAG, "row count does not match height"))
}

/// Encodes spawners as one `Spawner x y min max radius` line each.
#[must_use]
pub fn encode_spawners(spawners: &[Spawner]) -> Section {
    let mut section = Section::new(SPAWNERS_TAG, Vec::new());
    for spawner in spawners {
        section.push_line(format!(
            "{SPAWNER_ENTRY} {} {} {} {} {}",
            spawner.position.column(),
            spawner.position.row(),
            spawner.min_entities,
            spawner.max_entities,
            spawner.spawn_radius
        ));
    }
    section
}

/// Decodes a `Spawners` section.
pub fn decode_spawners(section: &Section) -> Result<Vec<Spawner>, PersistError> {
    let mut spawners = Vec::new();
    for entry in section.body() {
        let fields = entry_fields(SPAWNERS_TAG, entry, SPAWNER_ENTRY)?;
        let [column, row, min_entities, max_entities, spawn_radius] =
            parse_args::<5>(SPAWNERS_TAG, &fields)?;
        if min_entities > max_entities {
            return Err(PersistError::malformed(
                SPAWNERS_TAG,
                format!("minimum {min_entities} exceeds maximum {max_entities}"),
            ));
        }
        spawners.push(Spawner {
            position: CellCoord::new(column, row),
            min_entities,
            max_entities,
            spawn_radius,
            spawned: 0,
        });
    }
    Ok(spawners)
}

/// Encodes the player record as a `Player` section.
#[must_use]
pub fn encode_player(player: &PlayerRecord) -> Section {
    let mut section = Section::new(PLAYER_TAG, Vec::new());
    section.push_line(format!(
        "{POSITION_ENTRY} {} {}",
        player.position.column(),
        player.position.row()
    ));
    section
}

/// Decodes a `Player` section; the position entry is mandatory.
pub fn decode_player(section: &Section) -> Result<PlayerRecord, PersistError> {
    let mut position = None;
    for entry in section.body() {
        let fields = entry_fields(PLAYER_TAG, entry, POSITION_ENTRY)?;
        let [column, row] = parse_args::<2>(PLAYER_TAG, &fields)?;
        position = Some(CellCoord::new(column, row));
    }

    position
        .map(|position| PlayerRecord { position })
        .ok_or_else(|| PersistError::malformed(PLAYER_TAG, "missing position"))
}

fn entry_fields(
    tag: &'static str,
    entry: &Entry,
    keyword: &str,
) -> Result<Vec<String>, PersistError> {
    let Entry::Line(line) = entry else {
        return Err(PersistError::malformed(tag, "unexpected nested section"));
    };
    let mut tokens = line.split_whitespace();
    match tokens.next() {
        Some(found) if found == keyword => Ok(tokens.map(str::to_owned).collect()),
        other => Err(PersistError::malformed(
            tag,
            format!("expected `{keyword}` entry, found `{}`", other.unwrap_or_default()),
        )),
    }
}

fn parse_args<const N: usize>(tag: &'static str, args: &[String]) -> Result<[u32; N], PersistError> {
    if args.len() != N {
        return Err(PersistError::malformed(
            tag,
            format!("expected {N} values, found {}", args.len()),
        ));
    }

    let mut values = [0_u32; N];
    for (value, arg) in values.iter_mut().zip(args) {
        *value = arg
            .parse()
            .map_err(|_| PersistError::malformed(tag, format!("`{arg}` is not a number")))?;
    }
    Ok(values)
}
