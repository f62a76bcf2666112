//! Per-client dashboard state: the rendered tab, its rules, and event dispatch.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::api_call::ApiClient;
use crate::bindings::{BindingRegistry, RuleContext, Update};
use crate::config::AppConfig;
use crate::error::{DashError, Result};
use crate::loader::Datasets;
use crate::view::{self, ComponentId, ControlValue, TabId, ViewTree};

/// Settings shared by every session.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub api: ApiClient,
    pub preview_rows: usize,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            api: ApiClient::new(Duration::from_secs(config.api.timeout_secs)),
            preview_rows: config.upload.preview_rows,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

#[derive(Debug)]
pub struct Session {
    datasets: Arc<Datasets>,
    settings: SessionSettings,
    tree: ViewTree,
    registry: BindingRegistry,
}

impl Session {
    /// A new session showing the default tab.
    pub fn new(datasets: Arc<Datasets>, settings: SessionSettings) -> Self {
        let tab = TabId::default();
        Self {
            tree: view::render(tab, &datasets),
            registry: BindingRegistry::for_tab(tab),
            datasets,
            settings,
        }
    }

    pub fn tab(&self) -> TabId {
        self.tree.tab
    }

    pub fn tree(&self) -> &ViewTree {
        &self.tree
    }

    /// Renders `tab` from scratch. Control values of the previous visit are discarded.
    pub fn select_tab(&mut self, tab: TabId) -> &ViewTree {
        self.tree = view::render(tab, &self.datasets);
        self.registry = BindingRegistry::for_tab(tab);
        tracing::debug!(tab = tab.as_str(), "tab rendered");
        &self.tree
    }

    /// Stores a client-supplied JSON value into the control, then dispatches it.
    pub fn set_control_json(&mut self, id: ComponentId, raw: Value) -> Result<Vec<Update>> {
        let node = self.tree.find(id).ok_or(DashError::UnknownControl(id))?;
        let value = node
            .parse_value(raw)
            .map_err(|reason| DashError::InvalidControlValue { id, reason })?;
        self.set_control(id, value)
    }

    /// Stores `value` into the control and runs every rule it triggers.
    ///
    /// A rule output that rewrites a control's value counts as a change of that
    /// control and triggers its rules in turn. Each control and each rule is
    /// dispatched at most once per call.
    pub fn set_control(&mut self, id: ComponentId, value: ControlValue) -> Result<Vec<Update>> {
        let node = self
            .tree
            .find_mut(id)
            .ok_or(DashError::UnknownControl(id))?;
        node.set_control_value(value)
            .map_err(|reason| DashError::InvalidControlValue { id, reason })?;

        let mut dispatched = vec![id];
        let mut fired: Vec<usize> = Vec::new();
        let mut pending = VecDeque::from([id]);
        let mut updates = Vec::new();

        while let Some(changed) = pending.pop_front() {
            let rules: Vec<usize> = self
                .registry
                .triggered_by(changed)
                .filter(|i| !fired.contains(i))
                .collect();
            for index in rules {
                fired.push(index);
                let binding = &self.registry.bindings()[index];
                let produced = binding.run(&RuleContext {
                    datasets: &self.datasets,
                    tree: &self.tree,
                    api: &self.settings.api,
                    preview_rows: self.settings.preview_rows,
                });
                tracing::debug!(
                    rule = binding.name,
                    trigger = %changed,
                    outputs = produced.len(),
                    "rule fired"
                );

                for update in produced {
                    let Some(target) = self.tree.find_mut(update.id) else {
                        tracing::warn!(output = %update.id, "rule output not in tree");
                        continue;
                    };
                    match target.apply(update.content.clone()) {
                        Ok(true) if !dispatched.contains(&update.id) => {
                            dispatched.push(update.id);
                            pending.push_back(update.id);
                        }
                        Ok(_) => {}
                        Err(reason) => {
                            tracing::warn!(output = %update.id, %reason, "output rejected");
                            continue;
                        }
                    }
                    updates.push(update);
                }
            }
        }
        Ok(updates)
    }
}
