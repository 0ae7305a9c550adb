//! Render tree for one request/response cycle, plus the markdown and HTML
//! renderers that turn it into output.

use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text(String),
    Header(String),
    Subheader(String),
    Slider {
        key: &'static str,
        label: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },
    Select {
        key: &'static str,
        label: &'static str,
        options: Vec<i64>,
        value: i64,
    },
    Table(Vec<(String, String)>),
    Button(String),
    Success(String),
    Error(String),
    Metric { label: String, value: String },
    Progress(u8),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub title: String,
    pub sidebar: Vec<Element>,
    pub main: Vec<Element>,
}

impl Page {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn push(&mut self, element: Element) {
        self.main.push(element);
    }

    pub fn push_sidebar(&mut self, element: Element) {
        self.sidebar.push(element);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(Element::Success(message.into()));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Element::Error(message.into()));
    }
}

#[cfg(test)]
impl Page {
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.main.iter().filter_map(|element| match element {
            Element::Error(message) => Some(message.as_str()),
            _ => None,
        })
    }

    pub fn successes(&self) -> impl Iterator<Item = &str> {
        self.main.iter().filter_map(|element| match element {
            Element::Success(message) => Some(message.as_str()),
            _ => None,
        })
    }
}

const PROGRESS_WIDTH: usize = 20;

pub fn render_markdown(page: &Page) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# {}", page.title);
    let _ = writeln!(output);

    for element in page.sidebar.iter() {
        write_markdown_element(&mut output, element);
    }
    if !page.sidebar.is_empty() {
        let _ = writeln!(output);
    }

    for element in page.main.iter() {
        write_markdown_element(&mut output, element);
    }

    output
}

fn write_markdown_element(output: &mut String, element: &Element) {
    match element {
        Element::Text(text) => {
            let _ = writeln!(output, "{text}");
            let _ = writeln!(output);
        }
        Element::Header(text) => {
            let _ = writeln!(output, "## {text}");
        }
        Element::Subheader(text) => {
            let _ = writeln!(output);
            let _ = writeln!(output, "### {text}");
        }
        Element::Slider {
            label,
            min,
            max,
            value,
            ..
        } => {
            let _ = writeln!(output, "- {label}: {value} (range {min}-{max})");
        }
        Element::Select { label, value, .. } => {
            let _ = writeln!(output, "- {label}: {value}");
        }
        Element::Table(cells) => {
            let header: Vec<&str> = cells.iter().map(|(name, _)| name.as_str()).collect();
            let values: Vec<&str> = cells.iter().map(|(_, value)| value.as_str()).collect();
            let _ = writeln!(output, "| {} |", header.join(" | "));
            let _ = writeln!(output, "|{}", "---|".repeat(cells.len()));
            let _ = writeln!(output, "| {} |", values.join(" | "));
        }
        Element::Button(label) => {
            let _ = writeln!(output);
            let _ = writeln!(output, "[{label}]");
        }
        Element::Success(message) => {
            let _ = writeln!(output, "✅ {message}");
        }
        Element::Error(message) => {
            let _ = writeln!(output, "❌ {message}");
        }
        Element::Metric { label, value } => {
            let _ = writeln!(output, "{label}: {value}");
        }
        Element::Progress(percent) => {
            let filled = usize::from((*percent).min(100)) * PROGRESS_WIDTH / 100;
            let _ = writeln!(
                output,
                "[{}{}] {percent}%",
                "#".repeat(filled),
                ".".repeat(PROGRESS_WIDTH - filled)
            );
        }
    }
}

const STYLE: &str = r#"
    body { font-family: sans-serif; margin: 0; display: flex; }
    aside { width: 18rem; padding: 1rem; background: #f0f2f6; min-height: 100vh; }
    main { padding: 1rem 2rem; flex: 1; }
    label { display: block; margin-top: 0.75rem; }
    table { border-collapse: collapse; }
    td, th { border: 1px solid #ddd; padding: 0.25rem 0.5rem; }
    .success { background: #d4edda; color: #155724; padding: 0.5rem; border-radius: 5px; }
    .error { background: #f8d7da; color: #721c24; padding: 0.5rem; border-radius: 5px; }
    .metric-value { font-size: 2rem; }
    button {
        background-color: #4CAF50;
        color: white;
        font-weight: bold;
        padding: 0.5rem 1rem;
        border: none;
        border-radius: 5px;
    }
    button:hover { background-color: #45a049; }
"#;

pub fn render_html(page: &Page) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "<!DOCTYPE html>");
    let _ = writeln!(output, "<html><head><meta charset=\"utf-8\">");
    let _ = writeln!(output, "<title>{}</title>", escape(&page.title));
    let _ = writeln!(output, "<style>{STYLE}</style></head><body>");
    let _ = writeln!(output, "<form method=\"post\" action=\"/\" style=\"display:contents\">");

    let _ = writeln!(output, "<aside>");
    for element in page.sidebar.iter() {
        write_html_element(&mut output, element);
    }
    let _ = writeln!(output, "</aside>");

    let _ = writeln!(output, "<main>");
    let _ = writeln!(output, "<h1>{}</h1>", escape(&page.title));
    for element in page.main.iter() {
        write_html_element(&mut output, element);
    }
    let _ = writeln!(output, "</main>");

    let _ = writeln!(output, "</form></body></html>");
    output
}

fn write_html_element(output: &mut String, element: &Element) {
    match element {
        Element::Text(text) => {
            let _ = writeln!(output, "<p>{}</p>", inline_bold(&escape(text)));
        }
        Element::Header(text) => {
            let _ = writeln!(output, "<h2>{}</h2>", escape(text));
        }
        Element::Subheader(text) => {
            let _ = writeln!(output, "<h3>{}</h3>", escape(text));
        }
        Element::Slider {
            key,
            label,
            min,
            max,
            value,
        } => {
            let _ = writeln!(
                output,
                "<label for=\"{key}\">{}: <output>{value}</output></label>\
                 <input type=\"range\" id=\"{key}\" name=\"{key}\" min=\"{min}\" max=\"{max}\" \
                 value=\"{value}\" oninput=\"this.previousElementSibling.lastElementChild.value=this.value\">",
                escape(label)
            );
        }
        Element::Select {
            key,
            label,
            options,
            value,
        } => {
            let _ = writeln!(
                output,
                "<label for=\"{key}\">{}</label><select id=\"{key}\" name=\"{key}\">",
                escape(label)
            );
            for option in options.iter() {
                let selected = if option == value { " selected" } else { "" };
                let _ = writeln!(output, "<option value=\"{option}\"{selected}>{option}</option>");
            }
            let _ = writeln!(output, "</select>");
        }
        Element::Table(cells) => {
            let _ = writeln!(output, "<table><tr>");
            for (name, _) in cells.iter() {
                let _ = write!(output, "<th>{}</th>", escape(name));
            }
            let _ = writeln!(output, "</tr><tr>");
            for (_, value) in cells.iter() {
                let _ = write!(output, "<td>{}</td>", escape(value));
            }
            let _ = writeln!(output, "</tr></table>");
        }
        Element::Button(label) => {
            let _ = writeln!(output, "<p><button type=\"submit\">{}</button></p>", escape(label));
        }
        Element::Success(message) => {
            let _ = writeln!(output, "<div class=\"success\">{}</div>", escape(message));
        }
        Element::Error(message) => {
            let _ = writeln!(output, "<div class=\"error\">{}</div>", escape(message));
        }
        Element::Metric { label, value } => {
            let _ = writeln!(
                output,
                "<div class=\"metric\"><div>{}</div><div class=\"metric-value\">{}</div></div>",
                escape(label),
                escape(value)
            );
        }
        Element::Progress(percent) => {
            let _ = writeln!(
                output,
                "<progress max=\"100\" value=\"{percent}\">{percent}%</progress>"
            );
        }
    }
}

fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// Turns `**x**` pairs into <strong>; input must already be escaped.
fn inline_bold(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut open = false;
    let mut parts = input.split("**").peekable();
    while let Some(part) = parts.next() {
        out.push_str(part);
        if parts.peek().is_some() {
            out.push_str(if open { "</strong>" } else { "<strong>" });
            open = !open;
        }
    }
    if open {
        out.push_str("</strong>");
    }
    out
}
