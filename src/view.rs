//! View router: builds the component tree for a tab.
//!
//! `render` is a pure function of the tab and the loaded datasets. Every call
//! returns a brand-new tree, so controls revert to their defaults whenever a
//! tab is revisited.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::charts::{self, ChartSpec, HistFunc};
use crate::loader::Datasets;
use crate::table::TableData;

/// Measurement columns offered on tab 1.
pub const PENGUIN_MEASURES: [&str; 4] = [
    "bill_length_mm",
    "bill_depth_mm",
    "flipper_length_mm",
    "body_mass_g",
];
pub const DEFAULT_MEASURE: &str = "bill_length_mm";
/// Histogram bins on tab 1 are the penguins' islands.
pub const HISTOGRAM_GROUP: &str = "island";
pub const PENGUIN_PAGE_SIZE: usize = 11;

pub const DEFAULT_X_AXIS: &str = "alcohol";
pub const DEFAULT_Y_AXIS: &str = "malic_acid";
pub const DEFAULT_INGREDIENTS: [&str; 3] = ["alcohol", "ash", "malic_acid"];
/// The single option of the color-encode checklist.
pub const COLOR_ENCODE: &str = "Color-Encode";

pub const BOOKMARKS: [(&str, &str); 5] = [
    ("google", "https://www.google.com.tw/?hl=zh_TW"),
    ("youtube", "https://www.youtube.com/?hl=zh-TW&gl=TW"),
    ("facebook", "https://www.facebook.com/?locale=zh_TW"),
    ("instagram", "https://www.instagram.com/"),
    ("proxima", "https://ai-nutc.tw/person_page/proxima.html"),
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TabId {
    #[default]
    #[serde(rename = "tab-1")]
    Tab1,
    #[serde(rename = "tab-2")]
    Tab2,
    #[serde(rename = "tab-3")]
    Tab3,
}

impl TabId {
    pub const ALL: [Self; 3] = [Self::Tab1, Self::Tab2, Self::Tab3];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tab1 => "tab-1",
            Self::Tab2 => "tab-2",
            Self::Tab3 => "tab-3",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Tab1 => "Page 1",
            Self::Tab2 => "Page 2",
            Self::Tab3 => "Page 3",
        }
    }
}

impl FromStr for TabId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown tab '{}'", s))
    }
}

/// Identity of every control and output region the rules refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComponentId {
    ColumnChoice,
    HistogramChart,
    XAxis,
    YAxis,
    ColorEncode,
    ScatterChart,
    IngredientSelect,
    BarChart,
    CommentsTextarea,
    ClearComments,
    CommentsDisplay,
    UploadData,
    UploadPreview,
    DownloadSelect,
    ApiUrl,
    CallApi,
    ApiResult,
}

impl ComponentId {
    pub const ALL: [Self; 17] = [
        Self::ColumnChoice,
        Self::HistogramChart,
        Self::XAxis,
        Self::YAxis,
        Self::ColorEncode,
        Self::ScatterChart,
        Self::IngredientSelect,
        Self::BarChart,
        Self::CommentsTextarea,
        Self::ClearComments,
        Self::CommentsDisplay,
        Self::UploadData,
        Self::UploadPreview,
        Self::DownloadSelect,
        Self::ApiUrl,
        Self::CallApi,
        Self::ApiResult,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ColumnChoice => "column-choice",
            Self::HistogramChart => "histogram-chart",
            Self::XAxis => "x-axis",
            Self::YAxis => "y-axis",
            Self::ColorEncode => "color-encode",
            Self::ScatterChart => "scatter-chart",
            Self::IngredientSelect => "ingredient-select",
            Self::BarChart => "bar-chart",
            Self::CommentsTextarea => "comments-textarea",
            Self::ClearComments => "clear-comments",
            Self::CommentsDisplay => "comments-display",
            Self::UploadData => "upload-data",
            Self::UploadPreview => "upload-preview",
            Self::DownloadSelect => "download-select",
            Self::ApiUrl => "api-url",
            Self::CallApi => "call-api",
            Self::ApiResult => "api-result",
        }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("unknown component '{}'", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

impl SelectOption {
    pub fn same(value: &str) -> Self {
        Self {
            label: value.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedFile {
    pub filename: String,
    /// Data URL as produced by a browser file reader: `data:<mime>;base64,<payload>`.
    pub contents: String,
}

/// Current value of a control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlValue {
    Text(String),
    Choice(String),
    Choices(Vec<String>),
    Clicks(u64),
    File(UploadedFile),
}

impl ControlValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Choice(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_choices(&self) -> Option<&[String]> {
        match self {
            Self::Choices(v) => Some(v),
            _ => None,
        }
    }

    pub fn clicks(&self) -> u64 {
        match self {
            Self::Clicks(n) => *n,
            _ => 0,
        }
    }
}

/// New content for an output region, produced by a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Content {
    Figure(ChartSpec),
    Table(TableData),
    Options(Vec<SelectOption>),
    Text(String),
    /// Replaces a text control's value.
    Value(String),
    Error(String),
}

impl Content {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Figure(_) => "figure",
            Self::Table(_) => "table",
            Self::Options(_) => "options",
            Self::Text(_) => "text",
            Self::Value(_) => "value",
            Self::Error(_) => "error",
        }
    }
}

/// A node of the rendered tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Heading {
        text: String,
        color: String,
    },
    Label {
        text: String,
    },
    LineBreak,
    Container {
        #[serde(skip_serializing_if = "Option::is_none")]
        width: Option<String>,
        children: Vec<Node>,
    },
    RadioItems {
        id: ComponentId,
        options: Vec<String>,
        value: String,
        inline: bool,
    },
    Dropdown {
        id: ComponentId,
        options: Vec<SelectOption>,
        value: Vec<String>,
        multi: bool,
        clearable: bool,
    },
    Checklist {
        id: ComponentId,
        options: Vec<SelectOption>,
        value: Vec<String>,
    },
    DataTable {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<ComponentId>,
        table: TableData,
    },
    Graph {
        id: ComponentId,
        figure: Option<ChartSpec>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Textarea {
        id: ComponentId,
        value: String,
    },
    Button {
        id: ComponentId,
        label: String,
        n_clicks: u64,
    },
    Upload {
        id: ComponentId,
        label: String,
        filename: Option<String>,
        contents: Option<String>,
    },
    Link {
        label: String,
        href: String,
    },
    Input {
        id: ComponentId,
        value: String,
    },
    /// A plain region whose text is written by a rule.
    Output {
        id: ComponentId,
        text: String,
    },
}

impl Node {
    fn heading(text: &str, color: &str) -> Self {
        Self::Heading {
            text: text.to_string(),
            color: color.to_string(),
        }
    }

    fn container(children: Vec<Node>) -> Self {
        Self::Container {
            width: None,
            children,
        }
    }

    pub fn id(&self) -> Option<ComponentId> {
        match self {
            Self::RadioItems { id, .. }
            | Self::Dropdown { id, .. }
            | Self::Checklist { id, .. }
            | Self::Graph { id, .. }
            | Self::Textarea { id, .. }
            | Self::Button { id, .. }
            | Self::Upload { id, .. }
            | Self::Input { id, .. }
            | Self::Output { id, .. } => Some(*id),
            Self::DataTable { id, .. } => *id,
            _ => None,
        }
    }

    /// Value a rule sees for this control; None for output-only nodes or an empty single select.
    pub fn control_value(&self) -> Option<ControlValue> {
        match self {
            Self::RadioItems { value, .. } => Some(ControlValue::Choice(value.clone())),
            Self::Dropdown {
                value, multi: true, ..
            }
            | Self::Checklist { value, .. } => Some(ControlValue::Choices(value.clone())),
            Self::Dropdown { value, .. } => value.first().cloned().map(ControlValue::Choice),
            Self::Textarea { value, .. } | Self::Input { value, .. } => {
                Some(ControlValue::Text(value.clone()))
            }
            Self::Button { n_clicks, .. } => Some(ControlValue::Clicks(*n_clicks)),
            Self::Upload {
                filename: Some(filename),
                contents: Some(contents),
                ..
            } => Some(ControlValue::File(UploadedFile {
                filename: filename.clone(),
                contents: contents.clone(),
            })),
            _ => None,
        }
    }

    /// Interprets a JSON value sent by a client for this control.
    /// Buttons ignore the payload and count one more click.
    pub fn parse_value(&self, raw: Value) -> Result<ControlValue, String> {
        fn string(raw: Value) -> Result<String, String> {
            match raw {
                Value::String(s) => Ok(s),
                Value::Null => Ok(String::new()),
                other => Err(format!("expected a string, got {}", other)),
            }
        }
        fn strings(raw: Value) -> Result<Vec<String>, String> {
            match raw {
                Value::Null => Ok(Vec::new()),
                Value::Array(items) => items
                    .into_iter()
                    .map(|v| match v {
                        Value::String(s) => Ok(s),
                        other => Err(format!("expected a list of strings, got {}", other)),
                    })
                    .collect(),
                other => Err(format!("expected a list of strings, got {}", other)),
            }
        }

        match self {
            Self::RadioItems { .. } | Self::Dropdown { multi: false, .. } => {
                string(raw).map(ControlValue::Choice)
            }
            Self::Dropdown { multi: true, .. } | Self::Checklist { .. } => {
                strings(raw).map(ControlValue::Choices)
            }
            Self::Textarea { .. } | Self::Input { .. } => string(raw).map(ControlValue::Text),
            Self::Button { n_clicks, .. } => Ok(ControlValue::Clicks(n_clicks + 1)),
            Self::Upload { .. } => serde_json::from_value::<UploadedFile>(raw)
                .map(ControlValue::File)
                .map_err(|e| format!("expected {{filename, contents}}: {}", e)),
            _ => Err("not an interactive control".to_string()),
        }
    }

    /// Stores a new control value. Fails when the value's shape does not fit the control.
    pub fn set_control_value(&mut self, new_value: ControlValue) -> Result<(), String> {
        match (self, new_value) {
            (Self::RadioItems { value, .. }, ControlValue::Choice(v)) => *value = v,
            (
                Self::Dropdown {
                    value, multi: false, ..
                },
                ControlValue::Choice(v),
            ) => *value = vec![v],
            (
                Self::Dropdown {
                    value, multi: true, ..
                },
                ControlValue::Choices(v),
            )
            | (Self::Checklist { value, .. }, ControlValue::Choices(v)) => *value = v,
            (Self::Textarea { value, .. }, ControlValue::Text(v))
            | (Self::Input { value, .. }, ControlValue::Text(v)) => *value = v,
            (Self::Button { n_clicks, .. }, ControlValue::Clicks(n)) => *n_clicks = n,
            (
                Self::Upload {
                    filename, contents, ..
                },
                ControlValue::File(file),
            ) => {
                *filename = Some(file.filename);
                *contents = Some(file.contents);
            }
            (node, value) => {
                return Err(format!(
                    "{:?} does not fit {}",
                    value,
                    node.id().map(|id| id.as_str()).unwrap_or("this node")
                ))
            }
        }
        Ok(())
    }

    /// Writes rule output into this node. Returns true when a control's value changed.
    pub fn apply(&mut self, content: Content) -> Result<bool, String> {
        match (self, content) {
            (Self::Graph { figure, error, .. }, Content::Figure(spec)) => {
                *figure = Some(spec);
                *error = None;
            }
            (Self::Graph { figure, error, .. }, Content::Error(message)) => {
                *figure = None;
                *error = Some(message);
            }
            (Self::DataTable { table, .. }, Content::Table(new_table)) => *table = new_table,
            (Self::DataTable { table, .. }, Content::Error(message)) => {
                *table = TableData::failed(message)
            }
            (Self::Dropdown { options, value, .. }, Content::Options(new_options)) => {
                value.retain(|v| new_options.iter().any(|o| &o.value == v));
                *options = new_options;
            }
            (Self::Output { text, .. }, Content::Text(new_text))
            | (Self::Output { text, .. }, Content::Error(new_text)) => *text = new_text,
            (Self::Textarea { value, .. }, Content::Value(new_value)) => {
                *value = new_value;
                return Ok(true);
            }
            (node, content) => {
                return Err(format!(
                    "cannot apply {} output to {}",
                    content.kind(),
                    node.id().map(|id| id.as_str()).unwrap_or("this node")
                ))
            }
        }
        Ok(false)
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Self::Container { children, .. } => Some(children),
            _ => None,
        }
    }

    fn children(&self) -> Option<&Vec<Node>> {
        match self {
            Self::Container { children, .. } => Some(children),
            _ => None,
        }
    }
}

/// A rendered tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewTree {
    pub tab: TabId,
    pub root: Node,
}

impl ViewTree {
    pub fn find(&self, id: ComponentId) -> Option<&Node> {
        fn walk(node: &Node, id: ComponentId) -> Option<&Node> {
            if node.id() == Some(id) {
                return Some(node);
            }
            node.children()?.iter().find_map(|child| walk(child, id))
        }
        walk(&self.root, id)
    }

    pub fn find_mut(&mut self, id: ComponentId) -> Option<&mut Node> {
        fn walk(node: &mut Node, id: ComponentId) -> Option<&mut Node> {
            if node.id() == Some(id) {
                return Some(node);
            }
            node.children_mut()?
                .iter_mut()
                .find_map(|child| walk(child, id))
        }
        walk(&mut self.root, id)
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.find(id).is_some()
    }

    pub fn control_value(&self, id: ComponentId) -> Option<ControlValue> {
        self.find(id).and_then(Node::control_value)
    }

    /// Chart currently shown by the graph `id`.
    pub fn figure(&self, id: ComponentId) -> Option<&ChartSpec> {
        match self.find(id)? {
            Node::Graph { figure, .. } => figure.as_ref(),
            _ => None,
        }
    }

    /// Text of an output region or text control.
    pub fn text(&self, id: ComponentId) -> Option<&str> {
        match self.find(id)? {
            Node::Output { text, .. } => Some(text),
            Node::Textarea { value, .. } | Node::Input { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn table(&self, id: ComponentId) -> Option<&TableData> {
        match self.find(id)? {
            Node::DataTable { table, .. } => Some(table),
            _ => None,
        }
    }

    pub fn options(&self, id: ComponentId) -> Option<&[SelectOption]> {
        match self.find(id)? {
            Node::Dropdown { options, .. } | Node::Checklist { options, .. } => Some(options),
            _ => None,
        }
    }
}

/// Builds the full tree for `tab`. Charts with a default value are built eagerly.
pub fn render(tab: TabId, datasets: &Datasets) -> ViewTree {
    let root = match tab {
        TabId::Tab1 => render_penguins(datasets),
        TabId::Tab2 => render_wine(datasets),
        TabId::Tab3 => render_other(),
    };
    ViewTree { tab, root }
}

/// Graph node holding `chart`, or its error message when it could not be built.
fn graph(id: ComponentId, chart: crate::error::Result<ChartSpec>) -> Node {
    match chart {
        Ok(spec) => Node::Graph {
            id,
            figure: Some(spec),
            error: None,
        },
        Err(e) => {
            tracing::warn!(component = %id, error = %e, "initial chart failed");
            Node::Graph {
                id,
                figure: None,
                error: Some(e.user_message()),
            }
        }
    }
}

fn render_penguins(datasets: &Datasets) -> Node {
    let table = TableData::from_frame(&datasets.penguins)
        .map(|t| t.with_page_size(PENGUIN_PAGE_SIZE))
        .unwrap_or_else(|e| TableData::failed(e.user_message()));

    Node::container(vec![
        Node::heading("content of penguins_csv", "green"),
        Node::RadioItems {
            id: ComponentId::ColumnChoice,
            options: PENGUIN_MEASURES.iter().map(|s| s.to_string()).collect(),
            value: DEFAULT_MEASURE.to_string(),
            inline: true,
        },
        Node::DataTable { id: None, table },
        Node::heading("figure", "blue"),
        graph(
            ComponentId::HistogramChart,
            charts::histogram(
                &datasets.penguins,
                HISTOGRAM_GROUP,
                DEFAULT_MEASURE,
                HistFunc::Avg,
            ),
        ),
    ])
}

fn render_wine(datasets: &Datasets) -> Node {
    let options: Vec<SelectOption> = datasets
        .ingredients
        .iter()
        .map(|c| SelectOption::same(c))
        .collect();
    let default_ingredients: Vec<String> =
        DEFAULT_INGREDIENTS.iter().map(|s| s.to_string()).collect();

    let scatter_panel = Node::Container {
        width: Some("48%".to_string()),
        children: vec![
            Node::Dropdown {
                id: ComponentId::XAxis,
                options: options.clone(),
                value: vec![DEFAULT_X_AXIS.to_string()],
                multi: false,
                clearable: false,
            },
            Node::Dropdown {
                id: ComponentId::YAxis,
                options: options.clone(),
                value: vec![DEFAULT_Y_AXIS.to_string()],
                multi: false,
                clearable: false,
            },
            Node::Checklist {
                id: ComponentId::ColorEncode,
                options: vec![SelectOption::same(COLOR_ENCODE)],
                value: Vec::new(),
            },
            graph(
                ComponentId::ScatterChart,
                charts::scatter(&datasets.wine, DEFAULT_X_AXIS, DEFAULT_Y_AXIS, false),
            ),
        ],
    };

    let bar_panel = Node::Container {
        width: Some("48%".to_string()),
        children: vec![
            Node::Dropdown {
                id: ComponentId::IngredientSelect,
                options,
                value: default_ingredients.clone(),
                multi: true,
                clearable: false,
            },
            Node::LineBreak,
            graph(
                ComponentId::BarChart,
                charts::bar(&datasets.wine_avg, &default_ingredients),
            ),
        ],
    };

    Node::container(vec![
        Node::heading("content of wine", "blue"),
        scatter_panel,
        bar_panel,
    ])
}

fn render_other() -> Node {
    let mut links: Vec<Node> = vec![
        Node::DataTable {
            id: Some(ComponentId::UploadPreview),
            table: TableData::default(),
        },
        Node::Dropdown {
            id: ComponentId::DownloadSelect,
            options: Vec::new(),
            value: Vec::new(),
            multi: false,
            clearable: true,
        },
        Node::LineBreak,
    ];
    links.extend(BOOKMARKS.iter().map(|(label, href)| Node::Link {
        label: label.to_string(),
        href: href.to_string(),
    }));
    links.extend([
        Node::LineBreak,
        Node::Label {
            text: "API URL:".to_string(),
        },
        Node::Input {
            id: ComponentId::ApiUrl,
            value: String::new(),
        },
        Node::Button {
            id: ComponentId::CallApi,
            label: "Call API".to_string(),
            n_clicks: 0,
        },
        Node::Output {
            id: ComponentId::ApiResult,
            text: String::new(),
        },
    ]);

    Node::container(vec![
        Node::heading("other application", "red"),
        Node::Label {
            text: "Comments:".to_string(),
        },
        Node::Textarea {
            id: ComponentId::CommentsTextarea,
            value: String::new(),
        },
        Node::Button {
            id: ComponentId::ClearComments,
            label: "Clear Comments".to_string(),
            n_clicks: 0,
        },
        Node::LineBreak,
        Node::Upload {
            id: ComponentId::UploadData,
            label: "Upload File".to_string(),
            filename: None,
            contents: None,
        },
        Node::Output {
            id: ComponentId::CommentsDisplay,
            text: String::new(),
        },
        Node::container(links),
    ])
}
