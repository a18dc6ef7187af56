//! HTML pages, rendered with Tera from templates compiled into the binary.

use tera::{Context, Tera};
use weather_core::Observation;

use crate::notice::Notice;

pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("base.html", include_str!("../templates/base.html")),
            ("index.html", include_str!("../templates/index.html")),
            ("weather.html", include_str!("../templates/weather.html")),
        ])?;

        Ok(Self { tera })
    }

    pub fn home(&self, notice: Option<&Notice>, max_city_length: usize) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("notice", &notice);
        context.insert("max_city_length", &max_city_length);
        self.tera.render("index.html", &context)
    }

    pub fn weather(&self, notice: Option<&Notice>, records: &[Observation]) -> Result<String, tera::Error> {
        let mut context = Context::new();
        context.insert("notice", &notice);
        context.insert("weather_data", records);
        self.tera.render("weather.html", &context)
    }
}
