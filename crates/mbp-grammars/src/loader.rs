//! Dynamic linking of grammar libraries.
//!
//! Loaded libraries stay mapped for the process lifetime: a
//! `tree_sitter::Language` contains pointers into its backing library, so
//! unloading would leave dangling pointers behind. The loader therefore
//! retains every OS handle it opens and never drops them.

#![allow(unsafe_code)]

use libloading::Library;
use mbp_domain::{Error, Result};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;
use tree_sitter::Language;
use tree_sitter_language::LanguageFn;

/// Seam between the grammar manager and platform dynamic linking.
///
/// `link` only maps the library into the process; `load` additionally
/// resolves the grammar entry symbol into a language handle.
pub trait LibraryLoader: Send + Sync {
    fn link(&self, path: &Path) -> Result<()>;
    fn load(&self, path: &Path, symbol: &str) -> Result<Language>;
}

/// Production loader over `libloading`.
#[derive(Default)]
pub struct NativeLibraryLoader {
    /// Handles held open for the process lifetime.
    retained: Mutex<Vec<Library>>,
}

impl NativeLibraryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    fn open(&self, path: &Path) -> Result<Library> {
        // SAFETY: loading shared libraries is inherently unsafe; the files
        // come from the verified grammar cache or an operator-provided
        // override path, and conform to the tree-sitter grammar ABI.
        #[cfg(unix)]
        let library = unsafe {
            use libloading::os::unix::{Library as UnixLibrary, RTLD_GLOBAL, RTLD_LAZY};
            UnixLibrary::open(Some(path), RTLD_LAZY | RTLD_GLOBAL)
                .map(Library::from)
                .map_err(|e| Error::io(format!("failed to link {}: {e}", path.display())))?
        };
        #[cfg(not(unix))]
        let library = unsafe {
            Library::new(path)
                .map_err(|e| Error::io(format!("failed to link {}: {e}", path.display())))?
        };
        Ok(library)
    }
}

impl LibraryLoader for NativeLibraryLoader {
    fn link(&self, path: &Path) -> Result<()> {
        let library = self.open(path)?;
        debug!(path = %path.display(), "linked grammar library");
        self.retained
            .lock()
            .expect("loader handle list poisoned")
            .push(library);
        Ok(())
    }

    fn load(&self, path: &Path, symbol: &str) -> Result<Language> {
        let library = self.open(path)?;
        // SAFETY: the symbol is the grammar's C entry point with the
        // signature `const TSLanguage *tree_sitter_<lang>(void)`; the
        // returned pointers stay valid because the library is retained
        // for the process lifetime.
        let language = unsafe {
            let func: libloading::Symbol<'_, unsafe extern "C" fn() -> *const ()> = library
                .get(symbol.as_bytes())
                .map_err(|_| {
                    Error::grammar_incompatible(format!(
                        "symbol `{symbol}` not found in {}",
                        path.display()
                    ))
                })?;
            Language::new(LanguageFn::from_raw(*func))
        };
        debug!(path = %path.display(), symbol, "resolved grammar entry symbol");
        self.retained
            .lock()
            .expect("loader handle list poisoned")
            .push(library);
        Ok(language)
    }
}
