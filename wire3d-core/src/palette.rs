/// Glyph palettes indexed by quantized depth
use thiserror::Error;

const BRAILLE: &[&str] = &[" ", "⠁", "⠄", "⠅", "⠕", "⢕", "⢝", "⢵", "⢽", "⢿", "⣿"];
const BRAILLE_DITHERED: &[&str] = &[
    " ", "⠁", " ", "⠁", "⠄", "⠁", "⠄", "⠁", "⠁", "⠄", "⠄", "⠅", "⠄", "⠅", "⠅", "⠅", "⠕", "⠅",
    "⠕", "⠕", "⢕", "⠕", "⢕", "⢕", "⢝", "⢝", "⢝", "⢵", "⢝", "⢵", "⢵", "⢽", "⢵", "⢽", "⢽", "⢿",
    "⣿",
];
const BLOCKS: &[&str] = &[" ", "░", "▒", "▓", "█"];
const BLOCKS_DITHERED: &[&str] = &[
    " ", "░", "░", "▒", "░", "▒", "▒", "▒", "▓", "▒", "▓", "▓", "█", "▓", "█", "█", "█",
];
const ASCII: &[&str] = &[" ", ".", ":", "-", "=", "+", "*", "#", "%", "@"];
const COMBINED: &[&str] = &[
    " ", ".", "⠁", "⠄", ":", "⠅", "=", "+", "*", "⠕", "#", "%", "@", "⢕", "⢝", "░", "⢵", "⢽",
    "▒", "⢿", "⣿", "▓", "█",
];

/// Built-in glyph ramps, sparse to dense
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Ascii,
    Blocks,
    BlocksDithered,
    Braille,
    BrailleDithered,
    Combined,
}

impl Preset {
    pub fn glyphs(self) -> &'static [&'static str] {
        match self {
            Preset::Ascii => ASCII,
            Preset::Blocks => BLOCKS,
            Preset::BlocksDithered => BLOCKS_DITHERED,
            Preset::Braille => BRAILLE,
            Preset::BrailleDithered => BRAILLE_DITHERED,
            Preset::Combined => COMBINED,
        }
    }

    /// Parse a preset name, case-insensitive
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "ascii" => Some(Preset::Ascii),
            "blocks" => Some(Preset::Blocks),
            "blocks-d" | "blocks-dithered" => Some(Preset::BlocksDithered),
            "braille" => Some(Preset::Braille),
            "braille-d" | "braille-dithered" => Some(Preset::BrailleDithered),
            "combined" | "combo" => Some(Preset::Combined),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaletteError {
    #[error("a palette needs at least one glyph")]
    Empty,
    #[error("palette has {0} glyphs, more than a depth index can address")]
    TooLarge(usize),
}

/// An ordered glyph sequence. Index 0 is the background glyph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    glyphs: Vec<String>,
}

impl Palette {
    pub fn new<I, S>(glyphs: I) -> Result<Self, PaletteError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let glyphs: Vec<String> = glyphs.into_iter().map(Into::into).collect();
        if glyphs.is_empty() {
            return Err(PaletteError::Empty);
        }
        if glyphs.len() > usize::from(u16::MAX) {
            return Err(PaletteError::TooLarge(glyphs.len()));
        }
        Ok(Self { glyphs })
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Always false for a constructed palette
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Glyph for a depth index; out-of-range indices fall back to the background
    pub fn glyph(&self, index: u16) -> &str {
        self.glyphs
            .get(usize::from(index))
            .unwrap_or(&self.glyphs[0])
    }
}

impl From<Preset> for Palette {
    fn from(preset: Preset) -> Self {
        Self {
            glyphs: preset.glyphs().iter().map(|g| g.to_string()).collect(),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Preset::Braille.into()
    }
}
