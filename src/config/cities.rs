//! Per-city configuration: zone tables, store database ids, feed URLs.
//!
//! Zone tokens are stored lowercase and accent-stripped, matching what
//! [`crate::zones::normalize_zone_text`] produces. Table order matters: zone
//! inference resolves ties toward the earlier entry.

use std::env;
use std::path::PathBuf;

/// Everything city-specific a batch run needs.
pub struct CityConfig {
    pub name: String,
    pub display_name: String,
    /// Listing-store database id, from `STORE_DATABASE_ID_<CITY>`.
    pub database_id: String,
    /// Where this city's rejected-URL cache persists.
    pub cache_file: PathBuf,
    pub zone_table: Vec<(String, Vec<String>)>,
}

impl CityConfig {
    fn new(name: &str, display_name: &str, zone_table: Vec<(String, Vec<String>)>) -> Self {
        let database_id =
            env::var(format!("STORE_DATABASE_ID_{}", name.to_uppercase())).unwrap_or_default();
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            database_id,
            cache_file: PathBuf::from(format!("rejected_urls_cache_{name}.json")),
            zone_table,
        }
    }

    /// Feed URLs from numbered environment variables
    /// (`RSS_URL_BARCELONA_1`, `RSS_URL_BARCELONA_2`, ...), stopping at the
    /// first gap.
    pub fn rss_urls(&self) -> Vec<String> {
        let mut urls = Vec::new();
        for i in 1.. {
            match env::var(format!("RSS_URL_{}_{}", self.name.to_uppercase(), i)) {
                Ok(url) if !url.is_empty() => urls.push(url),
                _ => break,
            }
        }
        urls
    }
}

/// Known city names, in default-priority order.
pub fn available_cities() -> Vec<&'static str> {
    vec!["barcelona", "roma"]
}

/// Configuration for one city, `None` for unknown names.
pub fn city_config(name: &str) -> Option<CityConfig> {
    match name.to_lowercase().as_str() {
        "barcelona" => Some(CityConfig::new(
            "barcelona",
            "Barcelona",
            barcelona_zone_table(),
        )),
        "roma" => Some(CityConfig::new("roma", "Rome", rome_zone_table())),
        _ => None,
    }
}

fn table(rows: &[(&str, &[&str])]) -> Vec<(String, Vec<String>)> {
    rows.iter()
        .map(|(name, tokens)| {
            (
                name.to_string(),
                tokens.iter().map(|t| t.to_string()).collect(),
            )
        })
        .collect()
}

/// Barcelona and metropolitan area, macro-zone -> identifying tokens.
pub fn barcelona_zone_table() -> Vec<(String, Vec<String>)> {
    table(&[
        (
            "Ciutat Vella",
            &[
                "ciutat vella",
                "barri gotic",
                "el gotic",
                "gotic",
                "el born",
                "born",
                "la ribera",
                "ribera",
                "sant pere",
                "santa caterina",
                "barceloneta",
                "el raval",
                "raval",
            ][..],
        ),
        (
            "Eixample",
            &[
                "eixample",
                "dreta de l eixample",
                "dreta de leixample",
                "esquerra de l eixample",
                "esquerra de leixample",
                "sagrada familia",
                "fort pienc",
                "sant antoni",
            ][..],
        ),
        (
            "Gràcia",
            &[
                "gracia",
                "vila de gracia",
                "camp d en grassot",
                "vallcarca",
                "el coll",
                "gracia nova",
            ][..],
        ),
        (
            "Horta Guinardó",
            &[
                "horta",
                "guinardo",
                "el carmel",
                "can baro",
                "vall d hebron",
                "montbau",
                "la font d en fargues",
            ][..],
        ),
        (
            "Les Corts",
            &[
                "les corts",
                "pedralbes",
                "la maternitat i sant ramon",
                "sant ramon",
            ][..],
        ),
        (
            "Nou Barris",
            &[
                "nou barris",
                "porta",
                "prosperitat",
                "vilapicina",
                "canyelles",
                "la guineueta",
                "ciutat meridiana",
                "trinitat nova",
                "torre baro",
                "les roquetes",
            ][..],
        ),
        (
            "Sant Andreu",
            &[
                "sant andreu",
                "la sagrera",
                "trinitat vella",
                "bon pastor",
                "baro de viver",
                "navas",
            ][..],
        ),
        (
            "Sant Martí",
            &[
                "sant marti",
                "poblenou",
                "el poblenou",
                "diagonal mar",
                "el besos i el maresme",
                "besos",
                "el clot",
                "clot",
                "camp de l arpa",
                "camp de l arpa del clot",
                "vila olimpica",
                "provenals del poblenou",
            ][..],
        ),
        (
            "Sants-Montjuïc",
            &[
                "sants",
                "hostafrancs",
                "poble sec",
                "badal",
                "la marina",
                "montjuic",
                "zona franca",
            ][..],
        ),
        (
            "Sarrià-Sant Gervasi",
            &[
                "sarria",
                "les tres torres",
                "sant gervasi",
                "galvany",
                "la bonanova",
                "bonanova",
                "vallvidrera",
                "tibidabo",
                "les planes",
            ][..],
        ),
        (
            "Badalona",
            &[
                "badalona",
                "badal",
                "can bofarull",
                "can roca i roca",
                "casagemes",
                "canyet",
                "dalt la villa",
                "la salut",
                "morera",
                "progres",
                "remei",
                "sant roc",
                "sant roc de badalona",
            ][..],
        ),
        (
            "Santa Coloma de Gramenet",
            &[
                "santa coloma de gramenet",
                "santa coloma",
                "can peixauet",
                "fondo",
                "la salut",
                "morro de nou",
                "sant roc",
                "sant roc de santa coloma",
                "singuerlin",
            ][..],
        ),
        (
            "L'Hospitalet de Llobregat",
            &[
                "l hospitalet de llobregat",
                "l hospitalet",
                "hospitalet",
                "bellvitge",
                "can serra",
                "centre",
                "collblanc",
                "el gornal",
                "la florida",
                "la marina",
                "la torrassa",
                "pubilla cases",
                "sant josep",
                "santa eulalia",
            ][..],
        ),
    ])
}

/// Rome, macro-zone -> identifying tokens.
pub fn rome_zone_table() -> Vec<(String, Vec<String>)> {
    table(&[
        (
            "Centro Storico",
            &[
                "centro storico",
                "piazza navona",
                "campo de fiori",
                "pantheon",
                "piazza venezia",
                "fori imperiali",
                "colosseo",
                "foro romano",
                "palatino",
                "circo massimo",
            ][..],
        ),
        (
            "Trastevere",
            &[
                "trastevere",
                "santa maria in trastevere",
                "piazza santa cecilia",
                "viale trastevere",
            ][..],
        ),
        (
            "Testaccio",
            &[
                "testaccio",
                "monte testaccio",
                "piazza testaccio",
                "via marmorata",
            ][..],
        ),
        (
            "Monti",
            &[
                "monti",
                "rione monti",
                "via nazionale",
                "via cavour",
                "piazza della madonna dei monti",
            ][..],
        ),
        (
            "Esquilino",
            &[
                "esquilino",
                "piazza vittorio",
                "via merulana",
                "via dello statuto",
                "termini",
            ][..],
        ),
        (
            "Pigneto",
            &[
                "pigneto",
                "via del pigneto",
                "via casilina",
                "via prenestina",
            ][..],
        ),
        (
            "San Lorenzo",
            &[
                "san lorenzo",
                "via tiburtina",
                "piazza dell immacolata",
                "via dei sabelli",
            ][..],
        ),
        (
            "Parioli",
            &[
                "parioli",
                "via archimede",
                "via bruxelles",
                "via orlando",
                "villa borghese",
            ][..],
        ),
        (
            "Flaminio",
            &[
                "flaminio",
                "piazza del popolo",
                "via flaminia",
                "piazzale flaminio",
                "villa glori",
            ][..],
        ),
        (
            "Prati",
            &[
                "prati",
                "via cola di rienzo",
                "via ottaviano",
                "piazza risorgimento",
                "borgo",
            ][..],
        ),
        (
            "Vaticano",
            &[
                "vaticano",
                "borgo pio",
                "via della conciliazione",
                "piazza san pietro",
            ][..],
        ),
        (
            "Aurelio",
            &[
                "aurelio",
                "via aurelia",
                "via della pineta sacchetti",
                "villa doria pamphilj",
            ][..],
        ),
        (
            "Gianicolense",
            &[
                "gianicolense",
                "monteverde vecchio",
                "via gianicolense",
                "piazza san cosimato",
            ][..],
        ),
        (
            "Monteverde",
            &[
                "monteverde",
                "monteverde nuovo",
                "via carini",
                "piazza santa maria della luce",
            ][..],
        ),
        (
            "Ostiense",
            &[
                "ostiense",
                "via ostiense",
                "garbatella",
                "san paolo",
                "basilica san paolo",
            ][..],
        ),
        (
            "Ardeatino",
            &[
                "ardeatino",
                "via ardeatina",
                "via appia antica",
                "catacombe",
                "quartiere ardeatino",
            ][..],
        ),
        (
            "Appio Latino",
            &[
                "appio latino",
                "via appia nuova",
                "piazza tuscolo",
                "via latina",
            ][..],
        ),
        (
            "Tuscolano",
            &[
                "tuscolano",
                "via tuscolana",
                "cinecitta",
                "don bosco",
                "appio claudio",
            ][..],
        ),
        (
            "Colli Albani",
            &[
                "colli albani",
                "via appia nuova",
                "via tuscolana",
                "quartiere colli albani",
            ][..],
        ),
        (
            "Eur",
            &[
                "eur",
                "europe",
                "via cristoforo colombo",
                "piazza marconi",
                "laghetto dell eur",
            ][..],
        ),
    ])
}
