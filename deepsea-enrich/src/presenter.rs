//! View model assembly
//!
//! Merges a local record with an optional enrichment bundle. External data
//! wins where both exist; every missing piece silently falls back:
//! - Hero image: observation photo → local image → placeholder
//! - Summary: encyclopedia extract → local summary → empty
//! - Attribution: one link per resolved identifier (payload not required)

use crate::config::SourceSettings;
use crate::sources::{inaturalist, wikidata, wikipedia};
use crate::types::{EnrichmentBundle, LocalRecord, SourceIdentifier};
use deepsea_common::api::{AttributionLink, HeroImage, SourceKind, SpeciesView};

/// Canonical page locations of the three catalogs
#[derive(Debug, Clone)]
pub struct SourcePages {
    wikipedia_url: String,
    wikidata_url: String,
    inaturalist_site_url: String,
}

impl SourcePages {
    pub fn from_settings(settings: &SourceSettings) -> Self {
        Self {
            wikipedia_url: settings.wikipedia_url.clone(),
            wikidata_url: settings.wikidata_url.clone(),
            inaturalist_site_url: settings.inaturalist_site_url.clone(),
        }
    }

    /// Canonical page for an identifier
    pub fn url_for(&self, source: SourceKind, id: &SourceIdentifier) -> Option<String> {
        let url = match source {
            SourceKind::Encyclopedia => wikipedia::page_url(&self.wikipedia_url, id),
            SourceKind::KnowledgeBase => wikidata::page_url(&self.wikidata_url, id),
            SourceKind::Observation => inaturalist::page_url(&self.inaturalist_site_url, id),
        };
        url.map(String::from)
    }
}

impl Default for SourcePages {
    fn default() -> Self {
        Self::from_settings(&SourceSettings::default())
    }
}

/// Builds `SpeciesView`s
#[derive(Debug, Clone, Default)]
pub struct Presenter {
    pages: SourcePages,
}

impl Presenter {
    pub fn new(pages: SourcePages) -> Self {
        Self { pages }
    }

    pub fn present(&self, record: &LocalRecord, bundle: Option<&EnrichmentBundle>) -> SpeciesView {
        SpeciesView {
            record_id: record.id.clone(),
            title: record.common_name.clone(),
            hero_image: hero_image(record, bundle),
            caption: caption(record),
            summary: summary(record, bundle),
            body: record.body.clone(),
            look_for: record.look_for.clone(),
            display_note: record.display_note.clone(),
            regions: record.regions.clone(),
            attribution: bundle
                .map(|bundle| self.attribution(bundle))
                .unwrap_or_default(),
        }
    }

    fn attribution(&self, bundle: &EnrichmentBundle) -> Vec<AttributionLink> {
        SourceKind::ALL
            .iter()
            .filter_map(|&source| {
                let id = bundle.entry(source).id.as_ref()?;
                let url = self.pages.url_for(source, id)?;
                Some(AttributionLink {
                    source,
                    label: source.label().to_string(),
                    url,
                })
            })
            .collect()
    }
}

fn hero_image(record: &LocalRecord, bundle: Option<&EnrichmentBundle>) -> HeroImage {
    let photo = bundle
        .and_then(|b| b.payload(SourceKind::Observation))
        .and_then(inaturalist::default_photo_url);

    if let Some(url) = photo {
        return HeroImage::Observation(url.to_string());
    }

    match record.image.as_deref().map(str::trim) {
        Some(image) if !image.is_empty() => HeroImage::Local(image.to_string()),
        _ => HeroImage::Placeholder,
    }
}

fn summary(record: &LocalRecord, bundle: Option<&EnrichmentBundle>) -> String {
    let extract = bundle
        .and_then(|b| b.payload(SourceKind::Encyclopedia))
        .and_then(|page| page.get("extract"))
        .and_then(|extract| extract.as_str())
        .filter(|extract| !extract.trim().is_empty());

    extract
        .or(record.summary.as_deref())
        .unwrap_or_default()
        .to_string()
}

fn caption(record: &LocalRecord) -> String {
    let depth = format!("Depth {} to {} m.", record.depth_min_m, record.depth_max_m);
    match record.also_known_as.as_deref() {
        Some(aka) if !aka.trim().is_empty() => format!("Also called {}. {}", aka, depth),
        _ => depth,
    }
}
