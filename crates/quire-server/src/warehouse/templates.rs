//! Named server-side queries, runnable via `POST /template/{name}`.

use quire_common::TemplateInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub name: &'static str,
    pub description: &'static str,
    pub query: &'static str,
}

pub static TEMPLATES: &[Template] = &[
    Template {
        name: "salesDashboard",
        description: "최근 6개월 매출 요약",
        query: "SELECT DATE_TRUNC('month', order_date) AS month,
                       COUNT(*) AS orders,
                       SUM(amount) AS total_sales,
                       AVG(amount) AS avg_order_value
                  FROM orders
                 WHERE order_date >= DATEADD(month, -6, CURRENT_DATE())
                 GROUP BY 1
                 ORDER BY 1 DESC",
    },
    Template {
        name: "productPerformance",
        description: "제품별 판매 성과 (지난 30일)",
        query: "SELECT p.product_name,
                       p.category,
                       SUM(oi.quantity) AS units_sold,
                       SUM(oi.quantity * oi.unit_price) AS revenue
                  FROM order_items oi
                  JOIN products p ON p.product_id = oi.product_id
                  JOIN orders o ON o.order_id = oi.order_id
                 WHERE o.order_date >= DATEADD(day, -30, CURRENT_DATE())
                 GROUP BY 1, 2
                 ORDER BY revenue DESC
                 LIMIT 20",
    },
    Template {
        name: "salesByRegion",
        description: "지역별 매출 현황 (지난 90일)",
        query: "SELECT c.region,
                       COUNT(DISTINCT o.customer_id) AS customers,
                       COUNT(*) AS orders,
                       SUM(o.amount) AS total_sales
                  FROM orders o
                  JOIN customers c ON c.customer_id = o.customer_id
                 WHERE o.order_date >= DATEADD(day, -90, CURRENT_DATE())
                 GROUP BY 1
                 ORDER BY total_sales DESC",
    },
    Template {
        name: "customerAnalysis",
        description: "고객 세그먼트별 생애가치 분석",
        query: "SELECT c.segment,
                       COUNT(DISTINCT c.customer_id) AS customers,
                       SUM(o.amount) / NULLIF(COUNT(DISTINCT c.customer_id), 0) AS lifetime_value,
                       AVG(o.amount) AS avg_order_value
                  FROM customers c
                  LEFT JOIN orders o ON o.customer_id = c.customer_id
                 GROUP BY 1
                 ORDER BY lifetime_value DESC",
    },
    Template {
        name: "realTimeSales",
        description: "시간별 실시간 매출 현황 (최근 12시간)",
        query: "SELECT DATE_TRUNC('hour', created_at) AS hour,
                       COUNT(*) AS orders,
                       SUM(amount) AS total_sales
                  FROM orders
                 WHERE created_at >= DATEADD(hour, -12, CURRENT_TIMESTAMP())
                 GROUP BY 1
                 ORDER BY 1 DESC",
    },
    Template {
        name: "inventoryStatus",
        description: "제품별 재고 현황 및 소진 예상일",
        query: "SELECT p.product_name,
                       i.quantity_on_hand AS stock,
                       s.daily_units,
                       i.quantity_on_hand / NULLIF(s.daily_units, 0) AS days_remaining
                  FROM inventory i
                  JOIN products p ON p.product_id = i.product_id
                  LEFT JOIN (
                        SELECT oi.product_id, SUM(oi.quantity) / 30 AS daily_units
                          FROM order_items oi
                          JOIN orders o ON o.order_id = oi.order_id
                         WHERE o.order_date >= DATEADD(day, -30, CURRENT_DATE())
                         GROUP BY 1
                  ) s ON s.product_id = i.product_id
                 ORDER BY days_remaining ASC NULLS LAST",
    },
];

pub fn find(name: &str) -> Option<&'static Template> {
    TEMPLATES.iter().find(|t| t.name == name)
}

pub fn names() -> Vec<String> {
    TEMPLATES.iter().map(|t| t.name.to_owned()).collect()
}

pub fn infos() -> Vec<TemplateInfo> {
    TEMPLATES
        .iter()
        .map(|t| TemplateInfo {
            name: t.name.to_owned(),
            description: t.description.to_owned(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_findable() {
        let names = names();
        for (i, name) in names.iter().enumerate() {
            assert!(!names[i + 1..].contains(name), "duplicate template {name}");
            assert_eq!(find(name).map(|t| t.name), Some(name.as_str()));
        }
        assert!(find("dropTables").is_none());
    }

    #[test]
    fn template_listing() {
        insta::assert_json_snapshot!(infos(), @r#"
        [
          {
            "name": "salesDashboard",
            "description": "최근 6개월 매출 요약"
          },
          {
            "name": "productPerformance",
            "description": "제품별 판매 성과 (지난 30일)"
          },
          {
            "name": "salesByRegion",
            "description": "지역별 매출 현황 (지난 90일)"
          },
          {
            "name": "customerAnalysis",
            "description": "고객 세그먼트별 생애가치 분석"
          },
          {
            "name": "realTimeSales",
            "description": "시간별 실시간 매출 현황 (최근 12시간)"
          },
          {
            "name": "inventoryStatus",
            "description": "제품별 재고 현황 및 소진 예상일"
          }
        ]
        "#);
    }
}
