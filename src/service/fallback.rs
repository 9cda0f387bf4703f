//! Synthetic Espírito Santo dataset served when the census files cannot be used.
//!
//! Raw rows are generated deterministically and then go through the same
//! processing and assembly as real extracts, so every fallback table has the
//! canonical schema of its name.

use polars::prelude::*;

use crate::data::schema::{CO_ENTIDADE, NO_CURSO, NO_MUNICIPIO, TP_DEPENDENCIA, TP_LOCALIZACAO};
use crate::data::{PipelineError, RecordProcessor};
use crate::service::pipeline::{assemble_tables, Tables, TablePipeline};

const MUNICIPALITIES: [&str; 10] = [
    "Vitória",
    "Vila Velha",
    "Serra",
    "Cariacica",
    "Cachoeiro de Itapemirim",
    "Linhares",
    "Colatina",
    "Guarapari",
    "São Mateus",
    "Aracruz",
];

const COURSES: [&str; 8] = [
    "Técnico em Informática",
    "Técnico em Enfermagem",
    "Técnico em Administração",
    "Técnico em Logística",
    "Técnico em Eletrotécnica",
    "Técnico em Mecânica",
    "Técnico em Segurança do Trabalho",
    "Técnico em Agropecuária",
];

const SCHOOLS_PER_MUNICIPALITY: usize = 6;

/// Small linear congruential sequence; the same seed always yields the same data.
struct Sequence(u64);

impl Sequence {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn between(&mut self, low: i64, high: i64) -> i64 {
        low + (self.next() % (high - low + 1) as u64) as i64
    }
}

/// Raw school rows in the layout of the census extract.
pub fn raw_schools() -> PolarsResult<DataFrame> {
    let mut seq = Sequence(32);
    let rows = MUNICIPALITIES.len() * SCHOOLS_PER_MUNICIPALITY;

    let mut ids = Vec::with_capacity(rows);
    let mut municipalities = Vec::with_capacity(rows);
    let mut dependency = Vec::with_capacity(rows);
    let mut location = Vec::with_capacity(rows);
    let (mut doc_bas, mut doc_med) = (Vec::with_capacity(rows), Vec::with_capacity(rows));
    let (mut mat_bas, mut mat_med) = (Vec::with_capacity(rows), Vec::with_capacity(rows));
    let (mut tur_bas, mut tur_med) = (Vec::with_capacity(rows), Vec::with_capacity(rows));

    for (m, name) in MUNICIPALITIES.iter().enumerate() {
        for s in 0..SCHOOLS_PER_MUNICIPALITY {
            ids.push(32_000_000 + (m * 100 + s) as i64);
            municipalities.push(*name);
            dependency.push(seq.between(1, 4));
            // the first four are the metropolitan area: urban only
            location.push(if m < 4 || s % 3 != 0 { 1i64 } else { 2 });
            doc_bas.push(seq.between(8, 40));
            doc_med.push(seq.between(0, 25));
            mat_bas.push(seq.between(120, 900));
            mat_med.push(seq.between(0, 450));
            tur_bas.push(seq.between(4, 30));
            tur_med.push(seq.between(0, 15));
        }
    }

    DataFrame::new(vec![
        Column::new(CO_ENTIDADE.into(), ids),
        Column::new(NO_MUNICIPIO.into(), municipalities),
        Column::new(TP_DEPENDENCIA.into(), dependency),
        Column::new(TP_LOCALIZACAO.into(), location),
        Column::new("QT_DOC_BAS".into(), doc_bas),
        Column::new("QT_DOC_MED".into(), doc_med),
        Column::new("QT_MAT_BAS".into(), mat_bas),
        Column::new("QT_MAT_MED".into(), mat_med),
        Column::new("QT_TUR_BAS".into(), tur_bas),
        Column::new("QT_TUR_MED".into(), tur_med),
    ])
}

/// Raw technical-course offerings, a few per municipality.
pub fn raw_courses() -> PolarsResult<DataFrame> {
    let mut seq = Sequence(2024);

    let mut ids = Vec::new();
    let mut municipalities = Vec::new();
    let mut courses = Vec::new();
    let mut offered = Vec::new();
    let mut enrolled = Vec::new();

    for (m, name) in MUNICIPALITIES.iter().enumerate() {
        let offerings = 1 + (MUNICIPALITIES.len() - m) / 2;
        for o in 0..offerings {
            ids.push(32_000_000 + (m * 100 + o % SCHOOLS_PER_MUNICIPALITY) as i64);
            municipalities.push(*name);
            courses.push(COURSES[seq.between(0, COURSES.len() as i64 - 1) as usize]);
            offered.push(seq.between(1, 3));
            enrolled.push(seq.between(20, 160));
        }
    }

    DataFrame::new(vec![
        Column::new(CO_ENTIDADE.into(), ids),
        Column::new(NO_MUNICIPIO.into(), municipalities),
        Column::new(NO_CURSO.into(), courses),
        Column::new("QT_CURSO_TEC".into(), offered),
        Column::new("QT_MAT_CURSO_TEC".into(), enrolled),
    ])
}

/// Pipeline over the synthetic rows.
pub struct FallbackPipeline {
    top_courses: usize,
}

impl FallbackPipeline {
    pub fn new(top_courses: usize) -> Self {
        Self { top_courses }
    }
}

impl TablePipeline for FallbackPipeline {
    fn run(&self) -> Result<Tables, PipelineError> {
        let schools = RecordProcessor::process_schools(&raw_schools()?)?;
        let courses = RecordProcessor::process_courses(&raw_courses()?)?;
        assemble_tables(&schools, &courses, self.top_courses)
    }
}
