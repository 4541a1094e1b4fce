use serde::Serialize;

/// One read-only catalog entry. The catalog is fixed at compile time and
/// never mutated, so it needs no locking.
#[derive(Debug, Clone, Serialize)]
pub struct ProductRecord {
    pub id: u32,
    pub category: &'static str,
    pub style: &'static str,
    pub name: &'static str,
    pub model: &'static str,
    pub price_per_unit: f64,
    pub unit: &'static str,
    pub description: &'static str,
}

pub const CORE_CATEGORIES: [&str; 3] = ["flooring", "ceiling", "wallpaper"];

pub const DEFAULT_STYLE: &str = "modern";

/// Style options offered on the landing page, in display order.
pub const STYLE_OPTIONS: [&str; 5] = ["現代風", "北歐風", "工業風", "日式風", "美式風"];

/// Maps a localized or free-text style name onto the canonical catalog key,
/// defaulting to `modern` on no match.
pub fn normalize_style(style_name: &str) -> &'static str {
    match style_name.trim().to_lowercase().as_str() {
        "現代風" | "modern" => "modern",
        "北歐風" | "scandinavian" => "scandinavian",
        "工業風" | "industrial" => "industrial",
        "日式風" | "japanese" => "japanese",
        "美式風" | "american" => "american",
        "英式風" | "english" => "english",
        "鄉村風" | "country" => "country",
        _ => DEFAULT_STYLE,
    }
}

const fn product(
    id: u32,
    category: &'static str,
    style: &'static str,
    name: &'static str,
    model: &'static str,
    price_per_unit: f64,
    unit: &'static str,
    description: &'static str,
) -> ProductRecord {
    ProductRecord {
        id,
        category,
        style,
        name,
        model,
        price_per_unit,
        unit,
        description,
    }
}

pub static PRODUCT_CATALOG: &[ProductRecord] = &[
    // 現代風 (Modern)
    product(101, "flooring", "modern", "極簡灰木紋複合地板", "M-F001", 3500.0, "坪", "12mm厚，耐磨等級AC4，適合高人流區域。"),
    product(102, "flooring", "modern", "淺胡桃木複合地板", "M-F002", 4000.0, "坪", "耐磨防滑，溫潤色調。"),
    product(103, "wallpaper", "modern", "米白色乳膠漆", "M-W001", 900.0, "加侖", "環保無味，高遮蓋力。"),
    product(104, "wallpaper", "modern", "淺灰色乳膠漆", "M-W002", 950.0, "加侖", "清新灰色，適合臥室和書房。"),
    product(105, "ceiling", "modern", "現代風輕鋼龍骨天花板", "M-C001", 1800.0, "坪", "易施工，適合客廳與臥室。"),
    product(106, "ceiling", "modern", "石膏板天花板", "M-C002", 1600.0, "坪", "簡單白色天花板，低成本選擇。"),
    // 北歐風 (Scandinavian)
    product(201, "flooring", "scandinavian", "漂白橡木實木地板", "S-F001", 4800.0, "坪", "淺色系，溫暖質感。"),
    product(202, "flooring", "scandinavian", "淺灰色實木地板", "S-F002", 5000.0, "坪", "柔和色調，簡約北歐風。"),
    product(203, "wallpaper", "scandinavian", "淺灰色乳膠漆", "S-W001", 1000.0, "加侖", "柔和北歐色系，適合臥室。"),
    product(204, "wallpaper", "scandinavian", "莫蘭迪淺綠壁紙", "S-W002", 1200.0, "卷", "無縫貼合，提升空間柔和度。"),
    product(205, "ceiling", "scandinavian", "白色平板天花板", "S-C001", 1700.0, "坪", "簡潔設計，搭配木質家具。"),
    product(206, "ceiling", "scandinavian", "木質橫梁天花板", "S-C002", 1900.0, "坪", "北歐木質格調，適合客廳。"),
    // 工業風 (Industrial)
    product(301, "flooring", "industrial", "水泥灰環氧樹脂地坪", "I-F001", 2500.0, "坪", "耐重耐油污，表面光滑。"),
    product(302, "flooring", "industrial", "深灰水泥磚地板", "I-F002", 2700.0, "坪", "粗獷工業感，易清潔。"),
    product(303, "wallpaper", "industrial", "深灰水泥紋壁紙", "I-W001", 1400.0, "卷", "增加工業風格質感。"),
    product(304, "wallpaper", "industrial", "黑色金屬感乳膠漆", "I-W002", 1500.0, "加侖", "現代工業風，適合餐廳或客廳。"),
    product(305, "ceiling", "industrial", "裸露管線天花板", "I-C001", 2000.0, "坪", "工業風，帶復古感。"),
    product(306, "ceiling", "industrial", "黑色鋼架天花板", "I-C002", 2200.0, "坪", "現代工業風格，金屬感十足。"),
    // 日式風 (Japanese)
    product(401, "flooring", "japanese", "榻榻米地板", "J-F001", 3000.0, "坪", "天然草編，營造和風氛圍。"),
    product(402, "flooring", "japanese", "淺色橡木地板", "J-F002", 3500.0, "坪", "和風溫潤質感，適合臥室。"),
    product(403, "wallpaper", "japanese", "淺米色和紙壁紙", "J-W001", 1300.0, "卷", "柔和自然光感，典型日式風格。"),
    product(404, "wallpaper", "japanese", "淡木色乳膠漆", "J-W002", 1200.0, "加侖", "自然木質色，簡約日式風。"),
    product(405, "ceiling", "japanese", "木質格柵天花板", "J-C001", 1800.0, "坪", "簡約木質線條，適合茶室或臥室。"),
    product(406, "ceiling", "japanese", "白色平板天花板", "J-C002", 1600.0, "坪", "簡單白色天花板，低成本選擇。"),
    // 美式風 (American)
    product(501, "flooring", "american", "胡桃木實木地板", "A-F001", 5200.0, "坪", "厚實耐磨，經典美式風格。"),
    product(502, "flooring", "american", "橡木拼花地板", "A-F002", 5400.0, "坪", "拼花設計，適合客廳與餐廳。"),
    product(503, "wallpaper", "american", "淺米色乳膠漆", "A-W001", 1000.0, "加侖", "柔和色系，百搭風格。"),
    product(504, "wallpaper", "american", "淺咖啡色壁紙", "A-W002", 1200.0, "卷", "經典美式風格，搭配木質家具。"),
    product(505, "ceiling", "american", "石膏板吊頂", "A-C001", 2000.0, "坪", "標準美式吊頂，適合客廳與餐廳。"),
    product(506, "ceiling", "american", "白色裝飾線條天花板", "A-C002", 2200.0, "坪", "帶裝飾線條，經典美式感。"),
    // 英式風 (English)
    product(601, "flooring", "english", "橡木深色地板", "E-F001", 5000.0, "坪", "高質感英式風格地板。"),
    product(602, "flooring", "english", "胡桃木拼花地板", "E-F002", 5200.0, "坪", "拼花設計，經典英式風格。"),
    product(603, "wallpaper", "english", "淺米色乳膠漆", "E-W001", 1100.0, "加侖", "柔和英式色系，百搭牆面。"),
    product(604, "wallpaper", "english", "碎花壁紙", "E-W002", 1300.0, "卷", "經典英式碎花，提升溫馨感。"),
    product(605, "ceiling", "english", "白色石膏板天花板", "E-C001", 1800.0, "坪", "簡單白色天花板，低成本選擇。"),
    product(606, "ceiling", "english", "裝飾線條天花板", "E-C002", 2100.0, "坪", "帶裝飾線條，英式經典感。"),
    // 鄉村風 (Country)
    product(701, "flooring", "country", "松木實木地板", "C-F001", 3200.0, "坪", "自然木色，溫暖鄉村感。"),
    product(702, "flooring", "country", "橡木淺色地板", "C-F002", 3400.0, "坪", "簡約鄉村風，適合客廳。"),
    product(703, "wallpaper", "country", "淺米色乳膠漆", "C-W001", 900.0, "加侖", "溫暖色系，百搭牆面。"),
    product(704, "wallpaper", "country", "鄉村碎花壁紙", "C-W002", 1100.0, "卷", "典型鄉村風碎花設計。"),
    product(705, "ceiling", "country", "木質橫梁天花板", "C-C001", 1800.0, "坪", "鄉村木質線條，營造自然感。"),
    product(706, "ceiling", "country", "白色平板天花板", "C-C002", 1600.0, "坪", "簡單白色天花板，低成本選擇。"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_known_styles_and_defaults_the_rest() {
        assert_eq!(normalize_style("現代風"), "modern");
        assert_eq!(normalize_style("北歐風"), "scandinavian");
        assert_eq!(normalize_style(" Industrial "), "industrial");
        assert_eq!(normalize_style("日式風"), "japanese");
        assert_eq!(normalize_style("巴洛克風"), "modern");
        assert_eq!(normalize_style(""), "modern");
    }

    #[test]
    fn every_core_category_has_products_for_every_style() {
        let mut styles: Vec<&str> = PRODUCT_CATALOG.iter().map(|p| p.style).collect();
        styles.sort_unstable();
        styles.dedup();
        for style in styles {
            for category in CORE_CATEGORIES {
                assert!(
                    PRODUCT_CATALOG
                        .iter()
                        .any(|p| p.style == style && p.category == category),
                    "missing {category} entries for {style}"
                );
            }
        }
    }

    #[test]
    fn product_ids_are_unique() {
        let mut ids: Vec<u32> = PRODUCT_CATALOG.iter().map(|p| p.id).collect();
        ids.sort_unstable();
        let before = ids.len();
        ids.dedup();
        assert_eq!(before, ids.len());
    }
}
