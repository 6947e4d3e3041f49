//! Fixed ECharts layout hints shipped next to chart data so titles, legends
//! and axis labels do not overlap. Nothing in here depends on the numbers.

use serde_json::{json, Value};

fn title() -> Value {
    json!({
        "left": "center",
        "top": "10px",
        "textStyle": { "fontSize": 16, "fontWeight": "bold", "color": "#333" }
    })
}

fn grid(top: &str) -> Value {
    json!({
        "top": top,
        "left": "3%",
        "right": "4%",
        "bottom": "3%",
        "containLabel": true
    })
}

fn legend() -> Value {
    json!({ "top": "45px", "left": "center", "itemGap": 15 })
}

/// Category axis charts rotate their labels once there are more than five.
pub fn bar_layout(category_count: usize) -> Value {
    let rotate = if category_count > 5 { 45 } else { 0 };
    json!({
        "title": title(),
        "tooltip": { "trigger": "axis", "axisPointer": { "type": "shadow" } },
        "legend": legend(),
        "grid": grid("80px"),
        "xAxis": {
            "type": "category",
            "axisLabel": { "interval": 0, "rotate": rotate }
        },
        "yAxis": { "type": "value" }
    })
}

pub fn line_layout(point_count: usize) -> Value {
    let rotate = if point_count > 10 { 45 } else { 0 };
    json!({
        "title": title(),
        "tooltip": { "trigger": "axis" },
        "legend": legend(),
        "grid": grid("80px"),
        "xAxis": {
            "type": "category",
            "boundaryGap": false,
            "axisLabel": { "interval": 0, "rotate": rotate }
        },
        "yAxis": { "type": "value" }
    })
}

pub fn pie_layout(series_name: &str) -> Value {
    json!({
        "title": title(),
        "tooltip": { "trigger": "item", "formatter": "{a} <br/>{b}: {c} ({d}%)" },
        "legend": {
            "orient": "horizontal",
            "left": "center",
            "top": "45px",
            "itemGap": 15,
            "itemWidth": 14,
            "itemHeight": 14,
            "textStyle": { "fontSize": 12, "color": "#666" }
        },
        "series": [{
            "name": series_name,
            "type": "pie",
            "radius": ["40%", "70%"],
            "center": ["50%", "65%"],
            "avoidLabelOverlap": true,
            "label": { "show": false, "position": "center" },
            "emphasis": { "label": { "show": true, "fontSize": "16", "fontWeight": "bold" } },
            "labelLine": { "show": false }
        }],
        "grid": grid("90px")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_labels_rotate_for_many_categories() {
        assert_eq!(bar_layout(3)["xAxis"]["axisLabel"]["rotate"], 0);
        assert_eq!(bar_layout(6)["xAxis"]["axisLabel"]["rotate"], 45);
    }

    #[test]
    fn pie_series_is_named_after_group_column() {
        assert_eq!(pie_layout("region")["series"][0]["name"], "region");
    }
}
