//! Reactive rules: which controls trigger which recomputation, and where the results go.
//!
//! A `BindingRegistry` is built per tab render and only holds the rules whose
//! controls exist in that tab.

use serde::Serialize;

use crate::api_call::ApiClient;
use crate::charts::{self, HistFunc};
use crate::error::{DashError, Result};
use crate::loader::Datasets;
use crate::upload;
use crate::view::{
    ComponentId, Content, ControlValue, TabId, ViewTree, COLOR_ENCODE, HISTOGRAM_GROUP,
};

/// One output written by a rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Update {
    pub id: ComponentId,
    pub content: Content,
}

/// Everything a handler may read.
pub struct RuleContext<'a> {
    pub datasets: &'a Datasets,
    pub tree: &'a ViewTree,
    pub api: &'a ApiClient,
    pub preview_rows: usize,
}

impl RuleContext<'_> {
    fn value(&self, id: ComponentId) -> Result<ControlValue> {
        self.tree
            .control_value(id)
            .ok_or_else(|| DashError::InvalidControlValue {
                id,
                reason: "no value selected".to_string(),
            })
    }

    fn text(&self, id: ComponentId) -> Result<String> {
        match self.value(id)? {
            ControlValue::Text(s) | ControlValue::Choice(s) => Ok(s),
            other => Err(DashError::InvalidControlValue {
                id,
                reason: format!("expected text, found {:?}", other),
            }),
        }
    }

    fn choices(&self, id: ComponentId) -> Result<Vec<String>> {
        match self.value(id)? {
            ControlValue::Choices(v) => Ok(v),
            other => Err(DashError::InvalidControlValue {
                id,
                reason: format!("expected a selection list, found {:?}", other),
            }),
        }
    }

    fn clicks(&self, id: ComponentId) -> u64 {
        self.tree.control_value(id).map_or(0, |v| v.clicks())
    }
}

/// Produces one content per output, in output order. An empty vector leaves the outputs untouched.
pub type Handler = fn(&RuleContext<'_>) -> Result<Vec<Content>>;

pub struct Binding {
    pub name: &'static str,
    pub triggers: &'static [ComponentId],
    /// Read by the handler but never trigger it.
    pub state: &'static [ComponentId],
    pub outputs: &'static [ComponentId],
    handler: Handler,
}

impl Binding {
    pub fn is_triggered_by(&self, id: ComponentId) -> bool {
        self.triggers.contains(&id)
    }

    /// Runs the handler. An error becomes an error message on the first output.
    pub fn run(&self, ctx: &RuleContext<'_>) -> Vec<Update> {
        match (self.handler)(ctx) {
            Ok(contents) => self
                .outputs
                .iter()
                .zip(contents)
                .map(|(&id, content)| Update { id, content })
                .collect(),
            Err(e) => {
                tracing::warn!(rule = self.name, error = %e, "rule failed");
                vec![Update {
                    id: self.outputs[0],
                    content: Content::Error(e.user_message()),
                }]
            }
        }
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("triggers", &self.triggers)
            .field("state", &self.state)
            .field("outputs", &self.outputs)
            .finish()
    }
}

#[derive(Debug)]
pub struct BindingRegistry {
    tab: TabId,
    bindings: Vec<Binding>,
}

impl BindingRegistry {
    pub fn for_tab(tab: TabId) -> Self {
        let bindings = match tab {
            TabId::Tab1 => vec![Binding {
                name: "histogram",
                triggers: &[ComponentId::ColumnChoice],
                state: &[],
                outputs: &[ComponentId::HistogramChart],
                handler: update_histogram,
            }],
            TabId::Tab2 => vec![
                Binding {
                    name: "scatter",
                    triggers: &[
                        ComponentId::XAxis,
                        ComponentId::YAxis,
                        ComponentId::ColorEncode,
                    ],
                    state: &[],
                    outputs: &[ComponentId::ScatterChart],
                    handler: update_scatter,
                },
                Binding {
                    name: "bar",
                    triggers: &[ComponentId::IngredientSelect],
                    state: &[],
                    outputs: &[ComponentId::BarChart],
                    handler: update_bar,
                },
            ],
            TabId::Tab3 => vec![
                Binding {
                    name: "clear-comments",
                    triggers: &[ComponentId::ClearComments],
                    state: &[],
                    outputs: &[ComponentId::CommentsTextarea],
                    handler: clear_comments,
                },
                Binding {
                    name: "mirror-comments",
                    triggers: &[ComponentId::CommentsTextarea],
                    state: &[],
                    outputs: &[ComponentId::CommentsDisplay],
                    handler: mirror_comments,
                },
                Binding {
                    name: "upload-preview",
                    triggers: &[ComponentId::UploadData],
                    state: &[],
                    outputs: &[ComponentId::UploadPreview, ComponentId::DownloadSelect],
                    handler: preview_upload,
                },
                Binding {
                    name: "call-api",
                    triggers: &[ComponentId::CallApi],
                    state: &[ComponentId::ApiUrl],
                    outputs: &[ComponentId::ApiResult],
                    handler: call_api,
                },
            ],
        };
        Self { tab, bindings }
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Indices of the rules triggered by `id`, in registration order.
    pub fn triggered_by(&self, id: ComponentId) -> impl Iterator<Item = usize> + '_ {
        self.bindings
            .iter()
            .enumerate()
            .filter(move |(_, b)| b.is_triggered_by(id))
            .map(|(i, _)| i)
    }
}

fn update_histogram(ctx: &RuleContext<'_>) -> Result<Vec<Content>> {
    let column = ctx.text(ComponentId::ColumnChoice)?;
    let chart = charts::histogram(
        &ctx.datasets.penguins,
        HISTOGRAM_GROUP,
        &column,
        HistFunc::Avg,
    )?;
    Ok(vec![Content::Figure(chart)])
}

fn update_scatter(ctx: &RuleContext<'_>) -> Result<Vec<Content>> {
    let x = ctx.text(ComponentId::XAxis)?;
    let y = ctx.text(ComponentId::YAxis)?;
    let color = ctx
        .choices(ComponentId::ColorEncode)?
        .iter()
        .any(|flag| flag == COLOR_ENCODE);
    Ok(vec![Content::Figure(charts::scatter(
        &ctx.datasets.wine,
        &x,
        &y,
        color,
    )?)])
}

fn update_bar(ctx: &RuleContext<'_>) -> Result<Vec<Content>> {
    let ingredients = ctx.choices(ComponentId::IngredientSelect)?;
    Ok(vec![Content::Figure(charts::bar(
        &ctx.datasets.wine_avg,
        &ingredients,
    )?)])
}

fn clear_comments(ctx: &RuleContext<'_>) -> Result<Vec<Content>> {
    if ctx.clicks(ComponentId::ClearComments) == 0 {
        return Ok(Vec::new());
    }
    Ok(vec![Content::Value(String::new())])
}

fn mirror_comments(ctx: &RuleContext<'_>) -> Result<Vec<Content>> {
    Ok(vec![Content::Text(ctx.text(ComponentId::CommentsTextarea)?)])
}

fn preview_upload(ctx: &RuleContext<'_>) -> Result<Vec<Content>> {
    let Some(ControlValue::File(file)) = ctx.tree.control_value(ComponentId::UploadData) else {
        return Ok(vec![
            Content::Table(Default::default()),
            Content::Options(Vec::new()),
        ]);
    };
    let preview = upload::preview_or_error(&file, ctx.preview_rows);
    Ok(vec![
        Content::Table(preview.table),
        Content::Options(preview.options),
    ])
}

fn call_api(ctx: &RuleContext<'_>) -> Result<Vec<Content>> {
    if ctx.clicks(ComponentId::CallApi) == 0 {
        return Ok(Vec::new());
    }
    let url = ctx.text(ComponentId::ApiUrl)?;
    Ok(vec![Content::Text(ctx.api.call(&url))])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_only_holds_rules_for_the_tab() {
        let tab1 = BindingRegistry::for_tab(TabId::Tab1);
        assert_eq!(tab1.bindings().len(), 1);
        assert_eq!(tab1.triggered_by(ComponentId::XAxis).count(), 0);

        let tab2 = BindingRegistry::for_tab(TabId::Tab2);
        for id in [
            ComponentId::XAxis,
            ComponentId::YAxis,
            ComponentId::ColorEncode,
        ] {
            assert_eq!(tab2.triggered_by(id).collect::<Vec<_>>(), vec![0]);
        }
        assert_eq!(
            tab2.triggered_by(ComponentId::IngredientSelect)
                .collect::<Vec<_>>(),
            vec![1]
        );
    }

    #[test]
    fn state_controls_never_trigger() {
        let tab3 = BindingRegistry::for_tab(TabId::Tab3);
        assert_eq!(tab3.triggered_by(ComponentId::ApiUrl).count(), 0);
        let call = &tab3.bindings()[3];
        assert_eq!(call.state, &[ComponentId::ApiUrl]);
    }

    #[test]
    fn every_rule_has_an_output() {
        for tab in TabId::ALL {
            for binding in BindingRegistry::for_tab(tab).bindings() {
                assert!(!binding.outputs.is_empty(), "{}", binding.name);
                assert!(!binding.triggers.is_empty(), "{}", binding.name);
            }
        }
    }
}
