//! # Layers Module
//!
//! The detection-layer cascade: an ordered sequence of strategies, strict to
//! loose, each a pure partition `(records) -> (groups, remaining)`.
//!
//! ## Catalogue
//! | Layer | Signal | Default threshold |
//! |------------|-----------------------------|-------------------|
//! | exact      | BLAKE3 content digest       | bit-identical     |
//! | near-exact | perceptual 256-bit          | Hamming <= 2      |
//! | structural | difference hash             | Hamming <= 6      |
//! | wavelet    | wavelet hash                | Hamming <= 8      |
//! | broad      | average hash                | Hamming <= 10     |
//!
//! A record grouped by one layer - keeper included - never re-enters a later
//! layer; every layer only sees the still-ungrouped pool. Decode failures
//! exclude a record from the perceptual layers but not from the exact layer.

mod grouper;

pub use grouper::{components, UnionFind};

use crate::core::hasher::{prefix_hash, ContentDigest, FingerprintEngine, FingerprintKind};
use crate::core::scanner::ImageRecord;
use crate::events::{Event, EventSender, LayerEvent};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// The detection strategies, in cascade order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LayerKind {
    /// Byte-for-byte identical files
    Exact,
    /// Re-encodes and re-saves; tight perceptual threshold
    NearExact,
    /// Crops and minor edits; difference hash
    Structural,
    /// Compression artifacts and resizing; wavelet hash
    Wavelet,
    /// Visually similar images; loosest threshold, lowest confidence
    Broad,
}

impl LayerKind {
    /// Cascade order, strict to loose
    pub const CATALOGUE: [LayerKind; 5] = [
        LayerKind::Exact,
        LayerKind::NearExact,
        LayerKind::Structural,
        LayerKind::Wavelet,
        LayerKind::Broad,
    ];

    /// The fingerprint this layer compares, `None` for the exact layer
    pub fn fingerprint(&self) -> Option<FingerprintKind> {
        match self {
            LayerKind::Exact => None,
            LayerKind::NearExact => Some(FingerprintKind::Perceptual),
            LayerKind::Structural => Some(FingerprintKind::Difference),
            LayerKind::Wavelet => Some(FingerprintKind::Wavelet),
            LayerKind::Broad => Some(FingerprintKind::Average),
        }
    }

    /// What a reviewer should expect this layer to find
    pub fn description(&self) -> &'static str {
        match self {
            LayerKind::Exact => "Byte-for-byte identical files. Safe to move.",
            LayerKind::NearExact => "Visually identical re-encodes and re-saves. Very safe.",
            LayerKind::Structural => "Small crops, watermarks, minor edits. Low risk.",
            LayerKind::Wavelet => "The same image after compression or resizing. Medium risk.",
            LayerKind::Broad => {
                "Visually similar images (bursts, variants). Higher risk - review carefully."
            }
        }
    }

    /// The broad layer is reported distinctly so reviewers apply more
    /// scrutiny to its groups.
    pub fn low_confidence(&self) -> bool {
        matches!(self, LayerKind::Broad)
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerKind::Exact => write!(f, "exact"),
            LayerKind::NearExact => write!(f, "near-exact"),
            LayerKind::Structural => write!(f, "structural"),
            LayerKind::Wavelet => write!(f, "wavelet"),
            LayerKind::Broad => write!(f, "broad"),
        }
    }
}

/// Per-layer Hamming distance thresholds, externally configurable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerThresholds {
    pub near_exact: u32,
    pub structural: u32,
    pub wavelet: u32,
    pub broad: u32,
}

impl Default for LayerThresholds {
    fn default() -> Self {
        Self {
            near_exact: 2,
            structural: 6,
            wavelet: 8,
            broad: 10,
        }
    }
}

impl LayerThresholds {
    fn for_layer(&self, layer: LayerKind) -> u32 {
        match layer {
            LayerKind::Exact => 0,
            LayerKind::NearExact => self.near_exact,
            LayerKind::Structural => self.structural,
            LayerKind::Wavelet => self.wavelet,
            LayerKind::Broad => self.broad,
        }
    }
}

/// A maximal set of records connected by one layer's match predicate
#[derive(Debug)]
pub struct DuplicateGroup {
    pub id: Uuid,
    /// The layer that formed this group
    pub layer: LayerKind,
    /// All members, sorted by path; always >= 2
    pub members: Vec<ImageRecord>,
}

impl DuplicateGroup {
    pub fn new(layer: LayerKind, mut members: Vec<ImageRecord>) -> Self {
        debug_assert!(members.len() >= 2);
        members.sort_by(|a, b| a.path().cmp(b.path()));
        Self {
            id: Uuid::new_v4(),
            layer,
            members,
        }
    }

    /// Number of members that would be relocated (everything but the keeper)
    pub fn duplicate_count(&self) -> usize {
        self.members.len().saturating_sub(1)
    }
}

/// One detection layer with its configured threshold
pub struct DetectionLayer {
    kind: LayerKind,
    threshold: u32,
}

impl DetectionLayer {
    /// Build the full cascade in catalogue order
    pub fn catalogue(thresholds: &LayerThresholds) -> Vec<DetectionLayer> {
        LayerKind::CATALOGUE
            .iter()
            .map(|&kind| DetectionLayer {
                kind,
                threshold: thresholds.for_layer(kind),
            })
            .collect()
    }

    pub fn kind(&self) -> LayerKind {
        self.kind
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Partition the ungrouped pool into this layer's groups and the
    /// remaining records. Grouped members leave the pool for good.
    pub fn partition(
        &self,
        records: Vec<ImageRecord>,
        engine: &FingerprintEngine,
        events: &EventSender,
    ) -> (Vec<DuplicateGroup>, Vec<ImageRecord>) {
        events.send(Event::Layer(LayerEvent::Started {
            layer: self.kind,
            pool: records.len(),
        }));

        let (groups, remaining) = match self.kind.fingerprint() {
            None => self.partition_exact(records, engine, events),
            Some(kind) => self.partition_perceptual(kind, records, engine, events),
        };

        for group in &groups {
            events.send(Event::Layer(LayerEvent::GroupFormed {
                group_id: group.id,
                layer: group.layer,
                members: group.members.iter().map(|m| m.path().to_path_buf()).collect(),
            }));
        }

        events.send(Event::Layer(LayerEvent::Completed {
            layer: self.kind,
            groups_formed: groups.len(),
        }));

        (groups, remaining)
    }

    /// Exact layer: size buckets -> 4 KiB prefix filter -> full digests.
    /// The prefilters only skip files that cannot be byte-identical.
    fn partition_exact(
        &self,
        mut records: Vec<ImageRecord>,
        engine: &FingerprintEngine,
        events: &EventSender,
    ) -> (Vec<DuplicateGroup>, Vec<ImageRecord>) {
        let mut by_size: HashMap<u64, Vec<usize>> = HashMap::new();
        for (i, record) in records.iter().enumerate() {
            by_size.entry(record.byte_size()).or_default().push(i);
        }

        let size_candidates: Vec<usize> = by_size
            .into_values()
            .filter(|bucket| bucket.len() >= 2)
            .flatten()
            .collect();

        // Prefix pass: files whose first 4 KiB differ cannot match. A file
        // whose prefix cannot be read stays a candidate; the digest pass
        // will report it properly.
        let prefixes: Vec<(usize, Option<u64>)> = size_candidates
            .par_iter()
            .map(|&i| (i, prefix_hash(records[i].path())))
            .collect();

        let mut by_prefix: HashMap<u64, Vec<usize>> = HashMap::new();
        let mut unreadable: Vec<usize> = Vec::new();
        for (i, prefix) in prefixes {
            match prefix {
                Some(p) => by_prefix.entry(p).or_default().push(i),
                None => unreadable.push(i),
            }
        }

        let candidates: HashSet<usize> = by_prefix
            .into_values()
            .filter(|bucket| bucket.len() >= 2)
            .flatten()
            .chain(unreadable)
            .collect();

        engine.content_digests(&mut records, &candidates, events);

        let mut by_digest: HashMap<ContentDigest, Vec<usize>> = HashMap::new();
        for &i in &candidates {
            if let Some(digest) = records[i].content_digest() {
                by_digest.entry(*digest).or_default().push(i);
            }
        }

        let mut matched: Vec<Vec<usize>> = by_digest
            .into_values()
            .filter(|group| group.len() >= 2)
            .map(|mut group| {
                group.sort_unstable();
                group
            })
            .collect();
        matched.sort_by_key(|group| group[0]);

        split_into_groups(self.kind, records, matched)
    }

    /// Perceptual layers: fingerprint the pool, connect pairs within the
    /// threshold, take connected components.
    fn partition_perceptual(
        &self,
        kind: FingerprintKind,
        mut records: Vec<ImageRecord>,
        engine: &FingerprintEngine,
        events: &EventSender,
    ) -> (Vec<DuplicateGroup>, Vec<ImageRecord>) {
        engine.fingerprints(kind, &mut records, events);

        let eligible: Vec<usize> = (0..records.len())
            .filter(|&i| records[i].fingerprint(kind).is_some())
            .collect();

        let mut edges: Vec<(usize, usize)> = Vec::new();
        for (a, &i) in eligible.iter().enumerate() {
            let fp_i = records[i].fingerprint(kind).expect("eligible record");
            for &j in &eligible[a + 1..] {
                let fp_j = records[j].fingerprint(kind).expect("eligible record");
                if fp_i.distance(fp_j) <= self.threshold {
                    edges.push((i, j));
                }
            }
        }

        let matched = components(records.len(), &edges);
        split_into_groups(self.kind, records, matched)
    }
}

/// Route each record into its component's group or back into the pool.
fn split_into_groups(
    kind: LayerKind,
    records: Vec<ImageRecord>,
    matched: Vec<Vec<usize>>,
) -> (Vec<DuplicateGroup>, Vec<ImageRecord>) {
    let mut assignment: Vec<Option<usize>> = vec![None; records.len()];
    for (slot, component) in matched.iter().enumerate() {
        for &i in component {
            debug_assert!(assignment[i].is_none(), "record in two components");
            assignment[i] = Some(slot);
        }
    }

    let mut buckets: Vec<Vec<ImageRecord>> = (0..matched.len()).map(|_| Vec::new()).collect();
    let mut remaining: Vec<ImageRecord> = Vec::new();

    for (i, record) in records.into_iter().enumerate() {
        match assignment[i] {
            Some(slot) => buckets[slot].push(record),
            None => remaining.push(record),
        }
    }

    let mut groups: Vec<DuplicateGroup> = buckets
        .into_iter()
        .map(|members| DuplicateGroup::new(kind, members))
        .collect();
    groups.sort_by(|a, b| a.members[0].path().cmp(b.members[0].path()));

    (groups, remaining)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::null_sender;
    use image::{ImageBuffer, Rgb};
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn save_png(dir: &Path, name: &str, seed: u8) -> PathBuf {
        let path = dir.join(name);
        let img = ImageBuffer::from_fn(32, 32, |x, y| {
            Rgb([
                seed.wrapping_add((x * 7) as u8),
                seed.wrapping_add((y * 11) as u8),
                seed,
            ])
        });
        img.save(&path).unwrap();
        path
    }

    fn record_for(path: PathBuf) -> ImageRecord {
        let size = fs::metadata(&path).unwrap().len();
        let dimensions = image::image_dimensions(&path).ok();
        ImageRecord::new(path, size, dimensions, None)
    }

    fn exact_layer() -> DetectionLayer {
        DetectionLayer {
            kind: LayerKind::Exact,
            threshold: 0,
        }
    }

    fn broad_layer() -> DetectionLayer {
        DetectionLayer {
            kind: LayerKind::Broad,
            threshold: LayerThresholds::default().broad,
        }
    }

    #[test]
    fn catalogue_is_strict_to_loose() {
        let cascade = DetectionLayer::catalogue(&LayerThresholds::default());
        let kinds: Vec<_> = cascade.iter().map(|l| l.kind()).collect();
        assert_eq!(kinds, LayerKind::CATALOGUE);
    }

    #[test]
    fn exact_layer_groups_identical_copies() {
        let dir = TempDir::new().unwrap();
        let a = save_png(dir.path(), "a.png", 1);
        let b = dir.path().join("b.png");
        fs::copy(&a, &b).unwrap();
        let c = save_png(dir.path(), "c.png", 99);

        let records = vec![record_for(a), record_for(b), record_for(c)];
        let (groups, remaining) =
            exact_layer().partition(records, &FingerprintEngine::new(), &null_sender());

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].members.len(), 2);
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].path().ends_with("c.png"));
    }

    #[test]
    fn exact_layer_is_order_independent() {
        let dir = TempDir::new().unwrap();
        let a = save_png(dir.path(), "a.png", 1);
        let b = dir.path().join("b.png");
        fs::copy(&a, &b).unwrap();

        let forward = vec![record_for(a.clone()), record_for(b.clone())];
        let backward = vec![record_for(b), record_for(a)];

        let engine = FingerprintEngine::new();
        let (groups_f, _) = exact_layer().partition(forward, &engine, &null_sender());
        let (groups_b, _) = exact_layer().partition(backward, &engine, &null_sender());

        let paths_f: Vec<_> = groups_f[0].members.iter().map(|m| m.path().to_path_buf()).collect();
        let paths_b: Vec<_> = groups_b[0].members.iter().map(|m| m.path().to_path_buf()).collect();
        assert_eq!(paths_f, paths_b);
    }

    #[test]
    fn undecodable_files_still_match_exactly() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("x.jpg");
        let b = dir.path().join("y.jpg");
        fs::write(&a, b"garbage that is not an image").unwrap();
        fs::write(&b, b"garbage that is not an image").unwrap();

        let records = vec![record_for(a), record_for(b)];
        let (groups, remaining) =
            exact_layer().partition(records, &FingerprintEngine::new(), &null_sender());

        assert_eq!(groups.len(), 1);
        assert!(remaining.is_empty());
    }

    #[test]
    fn undecodable_files_never_enter_perceptual_layers() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("x.jpg");
        let b = dir.path().join("y.jpg");
        // Different bytes so the exact layer would not pair them either
        fs::write(&a, b"garbage one").unwrap();
        fs::write(&b, b"garbage two").unwrap();

        let records = vec![record_for(a), record_for(b)];
        let (groups, remaining) =
            broad_layer().partition(records, &FingerprintEngine::new(), &null_sender());

        assert!(groups.is_empty());
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|r| r.decode_failed()));
    }

    #[test]
    fn broad_layer_groups_visually_identical_images() {
        let dir = TempDir::new().unwrap();
        // Same pixels, different files (PNG vs BMP encodes differently)
        let a = save_png(dir.path(), "a.png", 5);
        let b = dir.path().join("b.bmp");
        image::open(&a).unwrap().save(&b).unwrap();

        let records = vec![record_for(a), record_for(b)];
        let (groups, remaining) =
            broad_layer().partition(records, &FingerprintEngine::new(), &null_sender());

        assert_eq!(groups.len(), 1);
        assert!(remaining.is_empty());
    }

    #[test]
    fn partition_never_duplicates_or_drops_records() {
        let dir = TempDir::new().unwrap();
        let a = save_png(dir.path(), "a.png", 1);
        let b = dir.path().join("b.png");
        fs::copy(&a, &b).unwrap();
        let c = save_png(dir.path(), "c.png", 130);
        let d = dir.path().join("d.jpg");
        fs::write(&d, b"unreadable").unwrap();

        let records = vec![record_for(a), record_for(b), record_for(c), record_for(d)];
        let total = records.len();

        let (groups, remaining) =
            exact_layer().partition(records, &FingerprintEngine::new(), &null_sender());

        let grouped: usize = groups.iter().map(|g| g.members.len()).sum();
        assert_eq!(grouped + remaining.len(), total);
    }

    #[test]
    fn group_members_are_sorted_by_path() {
        let dir = TempDir::new().unwrap();
        let b = save_png(dir.path(), "b.png", 1);
        let a = dir.path().join("a.png");
        fs::copy(&b, &a).unwrap();

        let records = vec![record_for(b), record_for(a)];
        let (groups, _) =
            exact_layer().partition(records, &FingerprintEngine::new(), &null_sender());

        assert!(groups[0].members[0].path().ends_with("a.png"));
        assert!(groups[0].members[1].path().ends_with("b.png"));
    }

    #[test]
    fn default_thresholds_loosen_down_the_cascade() {
        let thresholds = LayerThresholds::default();
        assert!(thresholds.near_exact < thresholds.structural);
        assert!(thresholds.structural < thresholds.wavelet);
        assert!(thresholds.wavelet < thresholds.broad);
    }

    #[test]
    fn layer_display_names() {
        assert_eq!(LayerKind::Exact.to_string(), "exact");
        assert_eq!(LayerKind::NearExact.to_string(), "near-exact");
        assert_eq!(LayerKind::Broad.to_string(), "broad");
    }

    #[test]
    fn only_broad_is_low_confidence() {
        assert!(LayerKind::Broad.low_confidence());
        assert!(LayerKind::CATALOGUE[..4].iter().all(|l| !l.low_confidence()));
    }
}
