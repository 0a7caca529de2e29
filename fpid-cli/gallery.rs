//! Gallery sources: where reference prints come from and how they decode.

use fpid_core::Image;
use crate::error::DecodeError;
use image::{GrayImage, ImageReader};
use std::path::{Path, PathBuf};

/// Indexed collection of reference images.
///
/// Index order is the enumeration order used for tie-breaking, so an
/// implementation must return the same order on every call.
pub trait Gallery: Sync {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Label reported for entry `index`
    fn identity(&self, index: usize) -> Option<&str>;

    /// Decode entry `index` to grayscale
    fn load(&self, index: usize) -> Result<Image, DecodeError>;
}

/// Read and decode an image file to 8-bit grayscale.
///
/// The format is guessed from the file contents, so files without a
/// recognised extension still decode.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Image, DecodeError> {
    let path = path.as_ref();
    let to_error = |source| DecodeError::Image {
        path: path.to_path_buf(),
        source,
    };
    let decoded = ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(|e| to_error(image::ImageError::IoError(e)))?
        .decode()
        .map_err(to_error)?;
    from_gray_image(decoded.into_luma8())
}

pub fn from_gray_image(img: GrayImage) -> Result<Image, DecodeError> {
    let (width, height) = img.dimensions();
    Ok(Image::new(width as usize, height as usize, img.into_raw())?)
}

pub fn to_gray_image(img: &Image) -> Option<GrayImage> {
    GrayImage::from_raw(img.width() as u32, img.height() as u32, img.pixels().to_vec())
}

/// Regular files of one directory, in file-name order, decoded on demand
#[derive(Debug, Clone)]
pub struct DirectoryGallery {
    root: PathBuf,
    entries: Vec<(String, PathBuf)>,
}

impl DirectoryGallery {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, DecodeError> {
        let root = dir.as_ref().to_path_buf();
        let to_error = |source| DecodeError::Directory {
            path: root.clone(),
            source,
        };

        let mut entries = Vec::new();
        for entry in std::fs::read_dir(&root).map_err(to_error)? {
            let path = entry.map_err(to_error)?.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path.file_name() else { continue };
            entries.push((name.to_string_lossy().into_owned(), path));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        Ok(Self { root, entries })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, index: usize) -> Option<&Path> {
        self.entries.get(index).map(|(_, p)| p.as_path())
    }
}

impl Gallery for DirectoryGallery {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn identity(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(name, _)| name.as_str())
    }

    fn load(&self, index: usize) -> Result<Image, DecodeError> {
        let (_, path) = self.entries.get(index).ok_or(DecodeError::OutOfRange {
            index,
            len: self.entries.len(),
        })?;
        load_image(path)
    }
}

/// Already-decoded images held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryGallery {
    entries: Vec<(String, Image)>,
}

impl MemoryGallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, identity: impl Into<String>, image: Image) {
        self.entries.push((identity.into(), image));
    }

    pub fn with(mut self, identity: impl Into<String>, image: Image) -> Self {
        self.push(identity, image);
        self
    }
}

impl Gallery for MemoryGallery {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn identity(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(name, _)| name.as_str())
    }

    fn load(&self, index: usize) -> Result<Image, DecodeError> {
        self.entries
            .get(index)
            .map(|(_, img)| img.clone())
            .ok_or(DecodeError::OutOfRange {
                index,
                len: self.entries.len(),
            })
    }
}
