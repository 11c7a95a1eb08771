//! Render configuration for the browser graph widget
//!
//! Layout and physics are computed client-side by vis-network; this only
//! describes the options object it is created with.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Barnes-Hut solver parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarnesHut {
    pub gravitational_constant: f64,
    pub spring_length: f64,
}

impl Default for BarnesHut {
    fn default() -> Self {
        Self {
            gravitational_constant: -3000.0,
            spring_length: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Physics {
    pub enabled: bool,
    pub barnes_hut: BarnesHut,
}

/// Widget options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphView {
    /// Pixel width; `None` fills the container
    pub width: Option<u32>,
    pub height: u32,
    pub directed: bool,
    pub hierarchical: bool,
    pub physics: Physics,
}

impl Default for GraphView {
    fn default() -> Self {
        Self {
            width: None,
            height: 600,
            directed: true,
            hierarchical: false,
            physics: Physics {
                enabled: true,
                barnes_hut: BarnesHut::default(),
            },
        }
    }
}

impl GraphView {
    /// CSS width of the graph container
    pub fn css_width(&self) -> String {
        match self.width {
            Some(px) => format!("{px}px"),
            None => "100%".to_string(),
        }
    }

    /// The options object passed to `new vis.Network(...)`
    pub fn network_options(&self) -> Value {
        let arrows = if self.directed { "to" } else { "" };

        json!({
            "height": format!("{}px", self.height),
            "width": self.css_width(),
            "edges": {
                "arrows": arrows,
                "font": { "size": 10, "align": "middle" },
                "smooth": { "type": "dynamic" },
            },
            "nodes": { "shape": "dot", "font": { "size": 14 } },
            "layout": { "hierarchical": { "enabled": self.hierarchical } },
            "physics": {
                "enabled": self.physics.enabled,
                "solver": "barnesHut",
                "barnesHut": self.physics.barnes_hut,
            },
            "interaction": { "hover": true, "tooltipDelay": 150 },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_view_options() {
        let options = GraphView::default().network_options();

        assert_eq!(options["height"], "600px");
        assert_eq!(options["width"], "100%");
        assert_eq!(options["edges"]["arrows"], "to");
        assert_eq!(options["layout"]["hierarchical"]["enabled"], false);
        assert_eq!(options["physics"]["barnesHut"]["gravitationalConstant"], -3000.0);
        assert_eq!(options["physics"]["barnesHut"]["springLength"], 100.0);
    }

    #[test]
    fn test_fixed_width() {
        let view = GraphView { width: Some(800), ..GraphView::default() };
        assert_eq!(view.css_width(), "800px");
    }
}
