// Writing fetched listings out as CSV

use anyhow::{Context, Result};
use serde::Serialize;
use std::io::Write;

use crate::models::ListingItem;

#[derive(Serialize)]
struct CsvRow<'a> {
    id: &'a str,
    title: Option<&'a str>,
    brand: Option<&'a str>,
    model: Option<&'a str>,
    year: Option<u32>,
    price: Option<u64>,
    discount_price: Option<u64>,
    km: Option<u64>,
    fuel: Option<&'a str>,
    transmission: Option<&'a str>,
    body: Option<&'a str>,
    color: Option<&'a str>,
    city: Option<&'a str>,
    image: Option<&'a str>,
}

impl<'a> From<&'a ListingItem> for CsvRow<'a> {
    fn from(item: &'a ListingItem) -> Self {
        Self {
            id: &item.id,
            title: item.title.as_deref(),
            brand: item.brand.as_deref(),
            model: item.model.as_deref(),
            year: item.year,
            price: item.price,
            discount_price: item.discount_price,
            km: item.km,
            fuel: item.fuel.as_deref(),
            transmission: item.transmission.as_deref(),
            body: item.body.as_deref(),
            color: item.color.as_deref(),
            city: item.city.as_deref(),
            image: item.image.as_deref(),
        }
    }
}

pub fn write_csv<W: Write>(items: &[ListingItem], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for item in items {
        csv_writer
            .serialize(CsvRow::from(item))
            .with_context(|| format!("Failed to write listing {} as CSV", item.id))?;
    }
    csv_writer.flush().context("Failed to flush CSV output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_one_row_per_listing() {
        let items = vec![
            ListingItem {
                title: Some("Swift VXI, 2nd owner".to_string()),
                brand: Some("Maruti Suzuki".to_string()),
                price: Some(450_000),
                ..ListingItem::new("1")
            },
            ListingItem::new("2"),
        ];
        let mut out = Vec::new();
        write_csv(&items, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("id,title,brand,model,year,price"));
        assert!(lines[1].starts_with("1,\"Swift VXI, 2nd owner\",Maruti Suzuki,,,450000"));
        assert!(lines[2].starts_with("2,,,"));
    }
}
