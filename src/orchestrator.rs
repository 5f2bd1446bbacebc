//! Per-slide render loop: title injection, z-order, tool lookup and validation,
//! grouped or flat dispatch, and the component registry.
//!
//! Component failures never abort a slide. They are logged, recorded in the
//! [`RenderReport`] and any shapes the failing renderer managed to add are rolled
//! back.

use serde::Serialize;
use serde::ser::SerializeMap;

use crate::config::{Config, slide_size_emu};
use crate::document::{Document, ShapeId, SlideCanvas, force_text_color};
use crate::error::{ComponentError, DeckError};
use crate::ir::{Component, Presentation, Slide};
use crate::layout::geometry::resolve;
use crate::layout::types::Rect;
use crate::theme::Theme;
use crate::tools::{PreparedRender, RenderContext, ToolLookup, ToolRegistry, resolve_color, sanitize_tool_name};

/// Tool that is always drawn flat, even when the component asks for a group.
const FLAT_ONLY_TOOL: &str = "table";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegistryEntry {
    pub tool: String,
    /// For groups: the group id first, then its direct members.
    pub shape_ids: Vec<ShapeId>,
    pub bounding_box: Option<Rect>,
    pub is_group: bool,
}

/// Component id → entry, in insertion order. Re-inserting an id replaces the
/// entry where it stands and logs a warning.
#[derive(Debug, Clone, Default)]
pub struct SlideRegistry {
    entries: Vec<(String, RegistryEntry)>,
}

impl SlideRegistry {
    pub fn insert(&mut self, id: impl Into<String>, entry: RegistryEntry) {
        let id = id.into();
        match self.entries.iter_mut().find(|(key, _)| *key == id) {
            Some((_, slot)) => {
                tracing::warn!(id = %id, previous = %slot.tool, tool = %entry.tool, "duplicate component id; replacing registry entry");
                *slot = entry;
            }
            None => self.entries.push((id, entry)),
        }
    }

    pub fn get(&self, id: &str) -> Option<&RegistryEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key == id)
            .map(|(_, entry)| entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RegistryEntry)> {
        self.entries.iter().map(|(key, entry)| (key.as_str(), entry))
    }
}

impl Serialize for SlideRegistry {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, entry) in &self.entries {
            map.serialize_entry(id, entry)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SlideRender {
    pub slide_id: String,
    pub registry: SlideRegistry,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedComponent {
    /// 1-based.
    pub slide: usize,
    pub id: String,
    pub tool: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedComponent {
    /// 1-based.
    pub slide: usize,
    pub id: String,
    pub tool: String,
    pub kind: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RenderReport {
    pub rendered: Vec<RenderedComponent>,
    pub skipped: Vec<SkippedComponent>,
}

impl RenderReport {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedDeck {
    /// Config theme with the IR theme applied.
    pub theme: Theme,
    pub document: Document,
    pub slides: Vec<SlideRender>,
    pub report: RenderReport,
}

/// Renders every slide of `presentation` with the tools in `tools`.
///
/// Only an unusable slide size is fatal; component problems end up in the report.
pub fn render_presentation(
    presentation: &Presentation,
    tools: &ToolRegistry,
    config: &Config,
) -> Result<RenderedDeck, DeckError> {
    let theme = config.theme.with_overrides(&presentation.theme);
    let (width, height) = slide_size_emu(&presentation.meta.slide_size, &config.render);
    if width <= 0 || height <= 0 {
        return Err(DeckError::Config(format!("slide size {width}x{height} EMU is not positive")));
    }
    tracing::info!(
        slides = presentation.slides.len(),
        width,
        height,
        "rendering presentation"
    );

    let mut document = Document::new(width, height);
    let bounds = document.bounds();
    let mut slides = Vec::with_capacity(presentation.slides.len());
    let mut report = RenderReport::default();

    for (idx, slide) in presentation.slides.iter().enumerate() {
        let slide_index = idx + 1;
        let slide_id = slide
            .resolved_id()
            .unwrap_or_else(|| format!("slide_{slide_index}"));
        let span = tracing::info_span!("slide", index = slide_index, id = %slide_id);
        let _guard = span.enter();

        let background = resolve_color(&theme, slide.background.as_deref(), theme.background_color());
        let canvas = document.add_slide(background);
        let mut pass = SlidePass {
            tools,
            config,
            theme: &theme,
            slide_index,
            bounds,
            canvas,
            registry: SlideRegistry::default(),
            report: &mut report,
        };
        for (cidx, component) in ordered_components(slide).iter().enumerate() {
            pass.render(component, cidx + 1);
        }
        tracing::debug!(components = pass.registry.len(), "slide done");
        slides.push(SlideRender {
            slide_id,
            registry: pass.registry,
        });
    }

    Ok(RenderedDeck {
        theme,
        document,
        slides,
        report,
    })
}

/// Slide components with the auto title prepended when needed, stably sorted by z-index.
///
/// A title that is empty after trimming counts as no title.
pub fn ordered_components(slide: &Slide) -> Vec<Component> {
    let mut components = slide.components.clone();
    if let Some(title) = slide.title.as_deref().map(str::trim).filter(|t| !t.is_empty())
        && !slide.has_title_component()
    {
        tracing::info!(title, "injecting slide title");
        components.insert(0, Component::auto_title(title));
    }
    components.sort_by_key(Component::z);
    components
}

struct SlidePass<'a> {
    tools: &'a ToolRegistry,
    config: &'a Config,
    theme: &'a Theme,
    slide_index: usize,
    bounds: Rect,
    canvas: &'a mut SlideCanvas,
    registry: SlideRegistry,
    report: &'a mut RenderReport,
}

impl SlidePass<'_> {
    fn render(&mut self, component: &Component, position: usize) {
        let tool = component.tool.trim();
        let id = component
            .id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("{tool}_{}_{position}", self.slide_index));
        let span = tracing::info_span!("component", id = %id, tool);
        let _guard = span.enter();

        match self.dispatch(component, &id) {
            Ok(entry) => {
                tracing::debug!(shapes = entry.shape_ids.len(), group = entry.is_group, "component rendered");
                self.registry.insert(id.clone(), entry);
                self.report.rendered.push(RenderedComponent {
                    slide: self.slide_index,
                    id,
                    tool: tool.to_string(),
                });
            }
            Err(err) => {
                match &err {
                    ComponentError::Render { .. } => tracing::error!(error = %err, "component skipped"),
                    _ => tracing::warn!(error = %err, "component skipped"),
                }
                self.report.skipped.push(SkippedComponent {
                    slide: self.slide_index,
                    id,
                    tool: tool.to_string(),
                    kind: err.kind(),
                    message: err.to_string(),
                });
            }
        }
    }

    fn dispatch(&mut self, component: &Component, id: &str) -> Result<RegistryEntry, ComponentError> {
        let tool = component.tool.trim();
        if let Some(message) = &component.malformed {
            return Err(ComponentError::Validation {
                tool: tool.to_string(),
                message: message.clone(),
            });
        }
        if tool.is_empty() {
            return Err(ComponentError::MissingTool);
        }
        let geom = resolve(
            component.pos.as_ref(),
            component.anchor.as_ref(),
            self.bounds,
            &self.config.layout.anchors,
        );

        let draw: PreparedRender<'_> = match self.tools.lookup(tool) {
            ToolLookup::Modern(entry) => entry.prepare(&component.data).map_err(|message| ComponentError::Validation {
                tool: tool.to_string(),
                message,
            })?,
            ToolLookup::Legacy(render) => {
                tracing::warn!("using legacy renderer; data is unvalidated");
                let data = &component.data;
                Box::new(move |geom, ctx: &mut RenderContext<'_>| render(data, geom, ctx))
            }
            ToolLookup::Missing => {
                tracing::debug!(available = ?self.tools.names(), "no tool registered under this name");
                return Err(ComponentError::Lookup {
                    tool: tool.to_string(),
                });
            }
        };

        let grouped = component.group && sanitize_tool_name(tool) != FLAT_ONLY_TOOL;
        let before = self.canvas.shapes.len();
        let text_color = self.theme.text_color();

        let result = {
            let mut sink = self.canvas.sink();
            let target = if grouped { sink.add_group(geom).1 } else { sink.reborrow() };
            let mut ctx = RenderContext {
                theme: self.theme,
                config: self.config,
                registry: &self.registry,
                sink: target,
                style: &component.style,
                slide_index: self.slide_index,
                component_id: id,
            };
            draw(geom, &mut ctx)
        };
        if let Err(err) = result {
            self.canvas.truncate(before);
            return Err(ComponentError::Render {
                tool: tool.to_string(),
                message: err.to_string(),
            });
        }

        let added = &mut self.canvas.shapes[before..];
        force_text_color(added, text_color);
        if grouped {
            let group = &added[0];
            let mut shape_ids = vec![group.id];
            shape_ids.extend(group.member_ids());
            Ok(RegistryEntry {
                tool: tool.to_string(),
                shape_ids,
                bounding_box: Some(geom),
                is_group: true,
            })
        } else {
            Ok(RegistryEntry {
                tool: tool.to_string(),
                shape_ids: added.iter().map(|s| s.id).collect(),
                bounding_box: Rect::bounding(added.iter().map(|s| &s.frame)),
                is_group: false,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ShapeKind;
    use crate::error::{ToolError, ToolResult};
    use crate::normalize::into_presentation;
    use crate::theme::Rgb;
    use crate::tools::Tool;
    use serde::Deserialize;
    use serde_json::{Value, json};

    /// Draws one labelled box.
    struct Boxes;

    impl Tool for Boxes {
        type Data = Value;

        fn render(&self, _: &Value, geom: Rect, ctx: &mut RenderContext<'_>) -> ToolResult {
            let frame = crate::document::TextFrame::plain("x", crate::document::Font::sized(10.0).colored(Rgb::new(1, 2, 3)));
            ctx.sink.add_rect(geom).set_text(frame);
            ctx.sink.add_oval(geom.inset(10, 10));
            Ok(())
        }
    }

    /// Requires `data.required`.
    struct Strict;

    #[derive(Deserialize)]
    struct StrictData {
        #[allow(dead_code)]
        required: String,
    }

    impl Tool for Strict {
        type Data = StrictData;

        fn render(&self, _: &StrictData, _: Rect, _: &mut RenderContext<'_>) -> ToolResult {
            Ok(())
        }
    }

    /// Draws a shape, then fails.
    struct Crashes;

    impl Tool for Crashes {
        type Data = Value;

        fn render(&self, _: &Value, geom: Rect, ctx: &mut RenderContext<'_>) -> ToolResult {
            ctx.sink.add_rect(geom);
            Err(ToolError::new("boom"))
        }
    }

    fn legacy_box(_: &Value, geom: Rect, ctx: &mut RenderContext<'_>) -> ToolResult {
        ctx.sink.add_rect(geom);
        Ok(())
    }

    fn registry() -> ToolRegistry {
        let mut tools = ToolRegistry::builtin();
        tools.register("valid", Boxes);
        tools.register("broken", Strict);
        tools.register("crashes", Crashes);
        tools.register_legacy("legacy_box", legacy_box);
        tools
    }

    fn render(ir: Value) -> RenderedDeck {
        let pres = into_presentation(crate::normalize::normalize(ir).unwrap()).unwrap();
        render_presentation(&pres, &registry(), &Config::default()).unwrap()
    }

    #[test]
    fn failed_validation_leaves_only_the_valid_entry() {
        let deck = render(json!([
            {"tool": "valid", "z_index": 1},
            {"tool": "broken", "z_index": 0}
        ]));
        let registry = &deck.slides[0].registry;
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["valid_1_2"]);
        assert_eq!(deck.report.skipped.len(), 1);
        assert_eq!(deck.report.skipped[0].kind, "validation");
        assert_eq!(deck.report.skipped[0].id, "broken_1_1");
    }

    #[test]
    fn title_is_injected_first_unless_present() {
        let deck = render(json!({"slides": [
            {"title": "Roadmap", "components": [{"tool": "valid", "z_index": -5}]},
            {"title": "Kept", "components": [{"tool": "slide_title", "id": "mine", "data": {"title": "Mine"}}]}
        ]}));
        let first = &deck.slides[0];
        assert_eq!(first.slide_id, "roadmap");
        assert_eq!(first.registry.ids().collect::<Vec<_>>(), vec!["auto_title", "valid_1_2"]);
        assert_eq!(first.registry.get("auto_title").map(|e| e.tool.as_str()), Some("slide_title"));

        let second = &deck.slides[1];
        assert_eq!(second.registry.ids().collect::<Vec<_>>(), vec!["mine"]);
    }

    #[test]
    fn injected_title_has_lowest_z() {
        let slide: Slide = serde_json::from_value(json!({
            "title": "T",
            "components": [{"tool": "valid", "z_index": -999}, {"tool": "valid"}]
        }))
        .unwrap();
        let ordered = ordered_components(&slide);
        assert_eq!(ordered[0].id.as_deref(), Some("auto_title"));
        assert_eq!(ordered[0].z(), -1000);
        assert_eq!(ordered.len(), 3);
    }

    #[test]
    fn grouped_components_record_group_then_members() {
        let deck = render(json!([{"tool": "valid", "id": "hero", "pos": {"x": 10, "y": 10, "w": 50, "h": 50}}]));
        let entry = deck.slides[0].registry.get("hero").unwrap();
        assert!(entry.is_group);
        assert_eq!(entry.shape_ids.len(), 3);

        let slide = &deck.document.slides[0];
        assert_eq!(slide.shapes.len(), 1);
        let group = &slide.shapes[0];
        assert!(group.is_group());
        assert_eq!(entry.shape_ids[0], group.id);
        assert_eq!(entry.bounding_box, Some(group.frame));

        // Text inside the group follows the theme text color.
        let text_color = deck.theme.text_color();
        let member = slide.find(entry.shape_ids[1]).unwrap();
        let run = member.text.as_ref().unwrap().runs().next().unwrap();
        assert_eq!(run.font.color, Some(text_color));
    }

    #[test]
    fn flat_components_record_new_shapes_and_their_union() {
        let deck = render(json!([
            {"tool": "valid", "group": false, "pos": {"x": 0, "y": 0, "w": 50, "h": 50}},
            {"tool": "table", "data": {"rows": [["a"]]}}
        ]));
        let registry = &deck.slides[0].registry;
        let valid = registry.get("valid_1_1").unwrap();
        assert!(!valid.is_group);
        assert_eq!(valid.shape_ids.len(), 2);
        let slide = &deck.document.slides[0];
        assert_eq!(valid.bounding_box, Some(slide.shapes[0].frame));

        let table = registry.get("table_1_2").unwrap();
        assert!(!table.is_group);
        assert!(matches!(slide.shapes[2].kind, ShapeKind::Table(_)));
    }

    #[test]
    fn render_failure_rolls_back_partial_shapes() {
        let deck = render(json!([
            {"tool": "valid", "group": false},
            {"tool": "crashes", "group": false},
            {"tool": "crashes"}
        ]));
        assert_eq!(deck.document.slides[0].shapes.len(), 2);
        assert_eq!(deck.slides[0].registry.len(), 1);
        let kinds: Vec<&str> = deck.report.skipped.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec!["render", "render"]);
        assert!(deck.report.skipped[0].message.contains("boom"));
    }

    #[test]
    fn unknown_and_empty_tools_are_skipped() {
        let deck = render(json!([
            {"tool": "pyramid_hierarchy"},
            {"tool": "  "},
            {"tool": "Legacy-Box"}
        ]));
        let kinds: Vec<&str> = deck.report.skipped.iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec!["lookup", "missing_tool"]);
        assert_eq!(deck.slides[0].registry.ids().collect::<Vec<_>>(), vec!["Legacy-Box_1_3"]);
    }

    #[test]
    fn ill_typed_component_fields_skip_only_that_component() {
        let deck = render(json!([
            {"tool": "plain_box", "id": "ok", "data": {"text": "fine"}},
            {"tool": "plain_box", "id": "bad_pos", "pos": {"x": "10%"}},
            {"tool": "plain_box", "z_index": 1.5}
        ]));
        let registry = &deck.slides[0].registry;
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["ok"]);
        assert_eq!(deck.document.slides[0].shapes.len(), 1);

        let skipped: Vec<(&str, &str)> = deck.report.skipped.iter().map(|s| (s.id.as_str(), s.kind)).collect();
        assert_eq!(skipped, vec![("bad_pos", "validation"), ("plain_box_1_3", "validation")]);
        assert!(deck.report.skipped[0].message.contains("plain_box"));
    }

    #[test]
    fn numeric_slide_title_is_still_injected() {
        let deck = render(json!({"slides": [{"title": 2024, "components": []}]}));
        assert_eq!(deck.slides[0].slide_id, "2024");
        assert!(deck.slides[0].registry.get("auto_title").is_some());
        assert!(deck.report.is_clean());
    }

    #[test]
    fn blank_title_is_not_injected() {
        let deck = render(json!({"slides": [{"title": "   ", "components": []}]}));
        assert!(deck.slides[0].registry.is_empty());
    }

    #[test]
    fn untitled_slides_fall_back_to_position_ids() {
        let deck = render(json!({"slides": [{"components": []}, {"components": []}]}));
        let ids: Vec<&str> = deck.slides.iter().map(|s| s.slide_id.as_str()).collect();
        assert_eq!(ids, vec!["slide_1", "slide_2"]);
    }

    #[test]
    fn duplicate_ids_replace_in_place() {
        let deck = render(json!([
            {"tool": "valid", "id": "a"},
            {"tool": "valid", "id": "b"},
            {"tool": "legacy_box", "id": "a"}
        ]));
        let registry = &deck.slides[0].registry;
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(registry.get("a").unwrap().tool, "legacy_box");
    }

    #[test]
    fn slide_background_and_size_follow_the_ir() {
        let deck = render(json!({
            "meta": {"slide_size": {"preset": "16x9"}},
            "theme": {"background": "#101010"},
            "slides": [{"components": []}, {"background": "primary", "components": []}]
        }));
        assert_eq!(deck.document.height, 5_143_500);
        assert_eq!(deck.document.slides[0].background, Rgb::new(0x10, 0x10, 0x10));
        assert_eq!(deck.document.slides[1].background, Rgb::new(0x0D, 0x6E, 0xFD));
    }

    #[test]
    fn registry_serializes_in_insertion_order() {
        let mut registry = SlideRegistry::default();
        let entry = RegistryEntry {
            tool: "t".to_string(),
            shape_ids: vec![2],
            bounding_box: None,
            is_group: false,
        };
        registry.insert("z", entry.clone());
        registry.insert("a", entry);
        let text = serde_json::to_string(&registry).unwrap();
        assert!(text.find("\"z\"").unwrap() < text.find("\"a\"").unwrap());
    }
}
