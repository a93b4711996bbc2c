//! Labels name build items; origins say where in the build files a name came from.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{BuildHasher, BuildHasherDefault, Hash, Hasher};

use ahash::AHasher;

use crate::atom::{Atom, Intern};
use crate::error::LabelError;

/// A fully qualified build item name: `//dir:name`, optionally followed by the
/// toolchain it is built in, `//dir:name(//toolchain_dir:toolchain_name)`.
///
/// Components are interned, so equality compares addresses and the hash is
/// computed once at construction. Ordering compares the text, directory
/// first.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Label<'a> {
    dir: Atom<'a>,
    name: Atom<'a>,
    toolchain: Option<(Atom<'a>, Atom<'a>)>,
    hash: u64,
}

impl<'a> Label<'a> {
    /// Creates a label in the default toolchain.
    pub fn new(dir: Atom<'a>, name: Atom<'a>) -> Self {
        Self::build(dir, name, None)
    }

    /// Creates a label built in `toolchain`. Any toolchain on `toolchain`
    /// itself is ignored.
    pub fn with_toolchain(dir: Atom<'a>, name: Atom<'a>, toolchain: &Label<'a>) -> Self {
        Self::build(dir, name, Some((toolchain.dir, toolchain.name)))
    }

    /// Parses source-absolute label text, interning its components.
    ///
    /// Accepted forms are `//dir:name`, `//dir` (the name is the last
    /// directory component) and either of those followed by a parenthesized
    /// toolchain label. Trailing slashes on the directory are dropped, so
    /// `//base/` and `//base` name the same directory.
    ///
    /// # Arguments
    ///
    /// * `interner` - Where the directory and name text is interned.
    /// * `text` - The label text.
    pub fn parse<I>(interner: &mut I, text: &str) -> Result<Self, LabelError>
    where
        I: Intern<'a> + ?Sized,
    {
        if text.is_empty() {
            return Err(LabelError::Empty);
        }

        let (main, toolchain_text) = match text.find('(') {
            Some(open) => {
                let inner = text[open + 1..]
                    .strip_suffix(')')
                    .ok_or_else(|| LabelError::InvalidToolchain(text.to_owned()))?;
                if inner.contains(['(', ')']) {
                    return Err(LabelError::InvalidToolchain(text.to_owned()));
                }
                (&text[..open], Some(inner))
            }
            None if text.contains(')') => {
                return Err(LabelError::InvalidToolchain(text.to_owned()));
            }
            None => (text, None),
        };

        let (dir, name) = split_label(text, main)?;
        let toolchain = match toolchain_text {
            Some(inner) => {
                let (tc_dir, tc_name) = split_label(text, inner)
                    .map_err(|_| LabelError::InvalidToolchain(text.to_owned()))?;
                Some((interner.intern(tc_dir), interner.intern(tc_name)))
            }
            None => None,
        };

        Ok(Self::build(interner.intern(dir), interner.intern(name), toolchain))
    }

    fn build(dir: Atom<'a>, name: Atom<'a>, toolchain: Option<(Atom<'a>, Atom<'a>)>) -> Self {
        let hash = BuildHasherDefault::<AHasher>::default().hash_one((dir, name, toolchain));
        Self {
            dir,
            name,
            toolchain,
            hash,
        }
    }

    /// The directory, e.g. `//src/base`. The root directory is `//`.
    pub fn dir(&self) -> Atom<'a> {
        self.dir
    }

    pub fn name(&self) -> Atom<'a> {
        self.name
    }

    /// The toolchain this label is built in, if one was given.
    pub fn toolchain(&self) -> Option<Label<'a>> {
        self.toolchain.map(|(dir, name)| Label::new(dir, name))
    }

    /// This label with its toolchain stripped.
    pub fn without_toolchain(&self) -> Label<'a> {
        Label::new(self.dir, self.name)
    }

    #[inline]
    pub fn hash_value(&self) -> u64 {
        self.hash
    }
}

// Splits `//dir:name` or `//dir` into its directory and name text.
fn split_label<'t>(whole: &str, text: &'t str) -> Result<(&'t str, &'t str), LabelError> {
    if let Some(ch) = text.chars().find(|c| c.is_whitespace() || c.is_control()) {
        return Err(LabelError::UnexpectedCharacter {
            text: whole.to_owned(),
            ch,
        });
    }
    let rest = text
        .strip_prefix("//")
        .ok_or_else(|| LabelError::NotAbsolute(whole.to_owned()))?;

    let (path, name) = match rest.split_once(':') {
        Some((path, name)) => {
            if let Some(ch) = name.chars().find(|c| *c == ':' || *c == '/') {
                return Err(LabelError::UnexpectedCharacter {
                    text: whole.to_owned(),
                    ch,
                });
            }
            (path, name)
        }
        None => {
            let trimmed = rest.trim_end_matches('/');
            let name = match trimmed.rfind('/') {
                Some(slash) => &trimmed[slash + 1..],
                None => trimmed,
            };
            (rest, name)
        }
    };
    if name.is_empty() {
        return Err(LabelError::EmptyName(whole.to_owned()));
    }

    let path = path.trim_end_matches('/');
    Ok((&text[..2 + path.len()], name))
}

impl Hash for Label<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl PartialOrd for Label<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Label<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dir
            .cmp(&other.dir)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.toolchain.cmp(&other.toolchain))
    }
}

impl fmt::Display for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dir, self.name)?;
        if let Some((dir, name)) = self.toolchain {
            write!(f, "({dir}:{name})")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Label<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Label({self})")
    }
}

/// Where a record was first referenced, for diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Origin<'a> {
    file: Option<Atom<'a>>,
    line: u32,
    column: u32,
}

impl<'a> Origin<'a> {
    pub fn new(file: Atom<'a>, line: u32, column: u32) -> Self {
        Self {
            file: Some(file),
            line,
            column,
        }
    }

    /// No provenance, e.g. for records created programmatically.
    pub fn unknown() -> Self {
        Self::default()
    }

    pub fn file(&self) -> Option<Atom<'a>> {
        self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn column(&self) -> u32 {
        self.column
    }

    pub fn is_unknown(&self) -> bool {
        self.file.is_none()
    }
}

impl fmt::Display for Origin<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.column),
            None => f.write_str("<unknown>"),
        }
    }
}
