/// A string which uses SmallString optimization for strings shorter than 23 characters.
///
/// Origins are almost always short relative paths, so they live inline.
pub type SsoString = smartstring::SmartString<smartstring::LazyCompact>;
/// Hash map designed for small keys.
pub type FastHashMap<K, V> = rustc_hash::FxHashMap<K, V>;
