//! Typed models for the classic resource kinds.
//!
//! Only the reference-bearing subset of each document schema is modelled;
//! unknown resource types fall back to the raw markup tree. Every model
//! implements [`VisitReferences`] so the rewriter knows exactly which fields
//! hold identifiers.

use serde::{Deserialize, Serialize};

use crate::rewrite::{RewritePass, VisitReferences};

/// Resource types with a typed model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    FeatureSource,
    LayerDefinition,
    MapDefinition,
    WebLayout,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::FeatureSource,
        ResourceKind::LayerDefinition,
        ResourceKind::MapDefinition,
        ResourceKind::WebLayout,
    ];

    pub fn from_type_name(name: &str) -> Option<Self> {
        match name {
            "FeatureSource" => Some(Self::FeatureSource),
            "LayerDefinition" => Some(Self::LayerDefinition),
            "MapDefinition" => Some(Self::MapDefinition),
            "WebLayout" => Some(Self::WebLayout),
            _ => None,
        }
    }

    pub fn type_name(self) -> &'static str {
        match self {
            Self::FeatureSource => "FeatureSource",
            Self::LayerDefinition => "LayerDefinition",
            Self::MapDefinition => "MapDefinition",
            Self::WebLayout => "WebLayout",
        }
    }
}

/// A connection to spatial data. Connection parameters name files and
/// providers, never other resources, so there is nothing to rewrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeatureSource {
    pub provider: String,
    #[serde(rename = "Parameter", default)]
    pub parameters: Vec<ConnectionParameter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectionParameter {
    pub name: String,
    pub value: String,
}

impl VisitReferences for FeatureSource {
    fn visit_references(&mut self, _pass: &mut RewritePass) {}
}

/// Styling of one feature class; points at the feature source it draws.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LayerDefinition {
    pub resource_id: String,
    pub feature_class: String,
    pub geometry: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl VisitReferences for LayerDefinition {
    fn visit_references(&mut self, pass: &mut RewritePass) {
        pass.resource_id(&mut self.resource_id);
    }
}

/// A composition of layers; each layer points at its layer definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapDefinition {
    pub name: String,
    pub coordinate_system: String,
    #[serde(rename = "MapLayer", default)]
    pub layers: Vec<MapLayer>,
    #[serde(rename = "MapLayerGroup", default)]
    pub groups: Vec<MapLayerGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapLayer {
    pub name: String,
    pub resource_id: String,
    #[serde(default)]
    pub legend_label: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl Default for MapLayer {
    fn default() -> Self {
        Self {
            name: String::new(),
            resource_id: String::new(),
            legend_label: String::new(),
            visible: true,
            group: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapLayerGroup {
    pub name: String,
    #[serde(default)]
    pub legend_label: String,
    #[serde(default = "default_true")]
    pub visible: bool,
}

impl VisitReferences for MapDefinition {
    fn visit_references(&mut self, pass: &mut RewritePass) {
        for layer in &mut self.layers {
            pass.descend(layer);
        }
        for group in &mut self.groups {
            pass.descend(group);
        }
    }
}

impl VisitReferences for MapLayer {
    fn visit_references(&mut self, pass: &mut RewritePass) {
        pass.resource_id(&mut self.resource_id);
    }
}

impl VisitReferences for MapLayerGroup {
    fn visit_references(&mut self, _pass: &mut RewritePass) {}
}

/// Viewer layout around a single map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebLayout {
    pub title: String,
    pub map: MapReference,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapReference {
    pub resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_view: Option<MapView>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MapView {
    pub center_x: f64,
    pub center_y: f64,
    pub scale: f64,
}

impl VisitReferences for WebLayout {
    fn visit_references(&mut self, pass: &mut RewritePass) {
        pass.descend(&mut self.map);
    }
}

impl VisitReferences for MapReference {
    fn visit_references(&mut self, pass: &mut RewritePass) {
        pass.resource_id(&mut self.resource_id);
    }
}

/// A resource with a typed model, tagged by kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedResource {
    FeatureSource(FeatureSource),
    LayerDefinition(LayerDefinition),
    MapDefinition(MapDefinition),
    WebLayout(WebLayout),
}

impl TypedResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::FeatureSource(_) => ResourceKind::FeatureSource,
            Self::LayerDefinition(_) => ResourceKind::LayerDefinition,
            Self::MapDefinition(_) => ResourceKind::MapDefinition,
            Self::WebLayout(_) => ResourceKind::WebLayout,
        }
    }
}

impl VisitReferences for TypedResource {
    fn visit_references(&mut self, pass: &mut RewritePass) {
        match self {
            Self::FeatureSource(r) => r.visit_references(pass),
            Self::LayerDefinition(r) => r.visit_references(pass),
            Self::MapDefinition(r) => r.visit_references(pass),
            Self::WebLayout(r) => r.visit_references(pass),
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
