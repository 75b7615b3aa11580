//! Ordered image list, current index, filter and mark sets

use app_fs::UniversalPath;
use std::collections::HashSet;

/// Which images are navigable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    All,
    Favorites,
    NonFavorites,
    Compare,
}

impl Filter {
    pub fn name(self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Favorites => "favorites",
            Filter::NonFavorites => "non-favorites",
            Filter::Compare => "compare",
        }
    }
}

/// The two user-maintained sets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkSet {
    Favorites,
    Compare,
}

/// Something the presentation layer should tell the user
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// The requested filter matched nothing; showing all images instead
    FilterFallback { requested: Filter },
    /// Opening a folder switched the filter back to all
    FilterReset { previous: Filter },
    /// A clear was requested on an empty set
    NothingToClear(MarkSet),
    /// The current image could not be decoded
    LoadFailed { path: UniversalPath, message: String },
}

/// Library state of the open folder
///
/// `image_files` is always the active filter applied to `all_files`, and
/// `current_index` is -1 exactly when `image_files` is empty.
#[derive(Debug)]
pub struct LibraryState {
    directory: Option<UniversalPath>,
    all_files: Vec<UniversalPath>,
    image_files: Vec<UniversalPath>,
    current_index: isize,
    filter: Filter,
    favorites: HashSet<UniversalPath>,
    compare: HashSet<UniversalPath>,
}

impl Default for LibraryState {
    fn default() -> Self {
        Self {
            directory: None,
            all_files: Vec::new(),
            image_files: Vec::new(),
            current_index: -1,
            filter: Filter::All,
            favorites: HashSet::new(),
            compare: HashSet::new(),
        }
    }
}

impl LibraryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with a freshly opened folder; filter goes back to all
    pub fn reset(
        &mut self,
        directory: UniversalPath,
        listing: Vec<UniversalPath>,
        favorites: HashSet<UniversalPath>,
        compare: HashSet<UniversalPath>,
    ) -> Option<Notice> {
        let notice = (self.filter != Filter::All).then_some(Notice::FilterReset {
            previous: self.filter,
        });

        self.directory = Some(directory);
        self.filter = Filter::All;
        self.favorites = favorites;
        self.compare = compare;
        self.image_files = listing.clone();
        self.all_files = listing;
        self.current_index = if self.image_files.is_empty() { -1 } else { 0 };
        notice
    }

    pub fn directory(&self) -> Option<&UniversalPath> {
        self.directory.as_ref()
    }

    /// Navigable images under the active filter
    pub fn image_files(&self) -> &[UniversalPath] {
        &self.image_files
    }

    /// Full sorted folder listing
    pub fn all_files(&self) -> &[UniversalPath] {
        &self.all_files
    }

    pub fn len(&self) -> usize {
        self.image_files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image_files.is_empty()
    }

    pub fn current_index(&self) -> isize {
        self.current_index
    }

    pub fn current_path(&self) -> Option<&UniversalPath> {
        usize::try_from(self.current_index)
            .ok()
            .and_then(|i| self.image_files.get(i))
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn index_of(&self, path: &UniversalPath) -> Option<usize> {
        self.image_files.iter().position(|p| p == path)
    }

    /// Select by index; out-of-range requests are ignored
    pub fn select_index(&mut self, index: usize) -> bool {
        if index >= self.image_files.len() {
            return false;
        }
        self.current_index = index as isize;
        true
    }

    pub fn select_path(&mut self, path: &UniversalPath) -> bool {
        match self.index_of(path) {
            Some(i) => self.select_index(i),
            None => false,
        }
    }

    /// Move by `delta`, wrapping around when `wrap` is set; returns whether the index changed
    pub fn step(&mut self, delta: isize, wrap: bool) -> bool {
        let len = self.image_files.len() as isize;
        if len == 0 {
            return false;
        }

        let target = self.current_index + delta;
        let target = if wrap {
            target.rem_euclid(len)
        } else {
            target.clamp(0, len - 1)
        };

        let changed = target != self.current_index;
        self.current_index = target;
        changed
    }

    pub fn first(&mut self) -> bool {
        let changed = self.current_index != 0;
        self.select_index(0) && changed
    }

    pub fn last(&mut self) -> bool {
        let last = self.image_files.len().saturating_sub(1);
        let changed = self.current_index != last as isize;
        self.select_index(last) && changed
    }

    /// Direct neighbors of the current image, for prefetching
    pub fn neighbors(&self) -> Vec<&UniversalPath> {
        let Ok(index) = usize::try_from(self.current_index) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(2);
        if let Some(prev) = index.checked_sub(1).and_then(|i| self.image_files.get(i)) {
            out.push(prev);
        }
        if let Some(next) = self.image_files.get(index + 1) {
            out.push(next);
        }
        out
    }

    // ===== Marks =====

    pub fn favorites(&self) -> &HashSet<UniversalPath> {
        &self.favorites
    }

    pub fn compare(&self) -> &HashSet<UniversalPath> {
        &self.compare
    }

    pub fn is_favorite(&self, path: &UniversalPath) -> bool {
        self.favorites.contains(path)
    }

    pub fn is_in_compare(&self, path: &UniversalPath) -> bool {
        self.compare.contains(path)
    }

    /// Flip membership; returns the new state
    pub fn toggle(&mut self, set: MarkSet, path: &UniversalPath) -> bool {
        let marks = self.marks_mut(set);
        if marks.remove(path) {
            false
        } else {
            marks.insert(path.clone());
            true
        }
    }

    pub fn mark(&mut self, set: MarkSet, path: &UniversalPath) {
        self.marks_mut(set).insert(path.clone());
    }

    /// Drop `path` from both sets; returns whether anything changed
    pub fn unmark_everywhere(&mut self, path: &UniversalPath) -> bool {
        let fav = self.favorites.remove(path);
        let cmp = self.compare.remove(path);
        fav || cmp
    }

    /// Empty a set; `false` when it was already empty
    pub fn clear_marks(&mut self, set: MarkSet) -> bool {
        let marks = self.marks_mut(set);
        if marks.is_empty() {
            return false;
        }
        marks.clear();
        true
    }

    fn marks_mut(&mut self, set: MarkSet) -> &mut HashSet<UniversalPath> {
        match set {
            MarkSet::Favorites => &mut self.favorites,
            MarkSet::Compare => &mut self.compare,
        }
    }

    // ===== Reconciliation =====

    /// Switch filter and rebuild the list
    pub fn set_filter(&mut self, filter: Filter, listing: Vec<UniversalPath>) -> Option<Notice> {
        self.filter = filter;
        self.reconcile(listing, None)
    }

    /// Rebuild after any mutation
    ///
    /// `listing` is the fresh, sorted folder content. The previously current
    /// image stays current when it survives. Otherwise the nearest survivor
    /// is chosen by walking the old unfiltered list forward, then backward,
    /// from its old position. `prefer` wins when it is visible. An empty
    /// result under a non-"all" filter falls back to "all".
    pub fn reconcile(&mut self, listing: Vec<UniversalPath>, prefer: Option<&UniversalPath>) -> Option<Notice> {
        let old_current = self.current_path().cloned();
        let old_index = self.current_index;
        let old_all = std::mem::replace(&mut self.all_files, listing);

        self.image_files = self.apply_filter();

        let mut notice = None;
        if self.image_files.is_empty() && self.filter != Filter::All {
            tracing::info!("Filter '{}' matched nothing, showing all images", self.filter.name());
            notice = Some(Notice::FilterFallback {
                requested: self.filter,
            });
            self.filter = Filter::All;
            self.image_files = self.all_files.clone();
        }

        self.current_index = self.choose_index(old_current.as_ref(), old_index, &old_all, prefer);
        notice
    }

    fn apply_filter(&self) -> Vec<UniversalPath> {
        self.all_files
            .iter()
            .filter(|p| match self.filter {
                Filter::All => true,
                Filter::Favorites => self.favorites.contains(*p),
                Filter::NonFavorites => !self.favorites.contains(*p),
                Filter::Compare => self.compare.contains(*p),
            })
            .cloned()
            .collect()
    }

    fn choose_index(
        &self,
        old_current: Option<&UniversalPath>,
        old_index: isize,
        old_all: &[UniversalPath],
        prefer: Option<&UniversalPath>,
    ) -> isize {
        if self.image_files.is_empty() {
            return -1;
        }

        if let Some(i) = prefer.and_then(|p| self.index_of(p)) {
            return i as isize;
        }

        if let Some(current) = old_current {
            if let Some(i) = self.index_of(current) {
                return i as isize;
            }
            if let Some(i) = self.nearest_survivor(current, old_all) {
                return i as isize;
            }
        }

        old_index.clamp(0, self.image_files.len() as isize - 1)
    }

    fn nearest_survivor(&self, current: &UniversalPath, old_all: &[UniversalPath]) -> Option<usize> {
        let pos = old_all.iter().position(|p| p == current)?;
        old_all[pos + 1..]
            .iter()
            .chain(old_all[..pos].iter().rev())
            .find_map(|candidate| self.index_of(candidate))
    }
}
