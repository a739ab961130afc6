use crate::routing::RouteTable;
use crate::xml::escape;

pub const SITEMAP_FILE_NAME: &str = "sitemap.xml";

/// One `<url>` per route marked for the sitemap, in declaration order.
pub fn generate_sitemap(routes: &RouteTable) -> String {
    let mut urls = String::new();

    for entry in routes.iter().filter(|entry| entry.in_sitemap) {
        urls.push_str(&format!("  <url>\n    <loc>{}</loc>\n", escape(&entry.url)));
        if let Some(lastmod) = entry.lastmod {
            urls.push_str(&format!(
                "    <lastmod>{}</lastmod>\n",
                lastmod.format("%Y-%m-%d")
            ));
        }
        urls.push_str("  </url>\n");
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
{}</urlset>
"#,
        urls
    )
}
