//! CSV output for every stage
//!
//! Numbers are written in Rust's shortest round-trip form so a table read back
//! yields the same values. Undefined statistics are written as `undefined`;
//! absent optional inputs (`se`, `N`) as empty fields.

use crate::aggregate::{BreakdownTable, SegmentTable};
use crate::correlation::{Coefficient, CorrelationMatrix};
use crate::record::Record;
use crate::significance::{SignificanceResult, TStatistic};

/// Written wherever a statistic could not be computed
pub const UNDEFINED: &str = "undefined";

/// Escape CSV field (handle commas, quotes, newlines)
fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn optional_text(field: &Option<String>) -> String {
    field.as_deref().map(escape_field).unwrap_or_default()
}

fn optional_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn statistic(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => UNDEFINED.to_string(),
    }
}

fn coefficient(c: &Coefficient) -> String {
    statistic(c.value())
}

fn t_value(t: &TStatistic) -> String {
    match t {
        TStatistic::Value(v) => v.to_string(),
        other => other.to_string(),
    }
}

fn push_row(output: &mut String, fields: &[String]) {
    output.push_str(&fields.join(","));
    output.push('\n');
}

/// Cleaned records, with the same column names as the survey export
pub fn records_to_csv(records: &[Record]) -> String {
    let mut output = String::from(
        "country,cabr,year,cut,subcut,indicator,Topic,EnglishName,value,se,N,method\n",
    );

    for r in records {
        push_row(
            &mut output,
            &[
                escape_field(&r.country),
                optional_text(&r.cabr),
                r.year.to_string(),
                escape_field(&r.cut),
                escape_field(&r.subcut),
                escape_field(&r.indicator),
                optional_text(&r.topic),
                optional_text(&r.english_name),
                r.value.to_string(),
                optional_number(r.se),
                optional_number(r.n),
                optional_text(&r.method),
            ],
        );
    }

    output
}

/// Segment table: `cut,subcut,<indicator codes...>`
pub fn segment_table_to_csv(table: &SegmentTable) -> String {
    let mut output = String::new();

    let mut header = vec!["cut".to_string(), "subcut".to_string()];
    header.extend(table.indicators.iter().map(|c| escape_field(c)));
    push_row(&mut output, &header);

    for row in &table.rows {
        let mut fields = vec![escape_field(&row.segment.cut), escape_field(&row.segment.subcut)];
        fields.extend(row.cells.iter().map(|c| statistic(*c)));
        push_row(&mut output, &fields);
    }

    output
}

/// Breakdown: one row per indicator, value/se/N per subcut
pub fn breakdown_to_csv(table: &BreakdownTable) -> String {
    let mut output = String::new();

    let mut header = vec!["indicator".to_string()];
    for subcut in &table.subcuts {
        for column in ["value", "se", "N"] {
            header.push(escape_field(&format!("{} {}", subcut, column)));
        }
    }
    push_row(&mut output, &header);

    for (code, cells) in &table.rows {
        let mut fields = vec![escape_field(code)];
        for cell in cells {
            fields.push(statistic(cell.value));
            fields.push(optional_number(cell.se));
            fields.push(optional_number(cell.n));
        }
        push_row(&mut output, &fields);
    }

    output
}

/// Square correlation matrix with indicator codes on both axes
pub fn matrix_to_csv(matrix: &CorrelationMatrix) -> String {
    let mut output = String::new();

    let mut header = vec!["indicator".to_string()];
    header.extend(matrix.labels.iter().map(|l| escape_field(l)));
    push_row(&mut output, &header);

    for (i, label) in matrix.labels.iter().enumerate() {
        let mut fields = vec![escape_field(label)];
        fields.extend((0..matrix.size()).map(|j| coefficient(&matrix.get(i, j).coefficient)));
        push_row(&mut output, &fields);
    }

    output
}

/// One row per tested pair
pub fn significance_to_csv(results: &[SignificanceResult]) -> String {
    let mut output = String::from(
        "first,second,first_name,second_name,label,r,observations,df,t,p,\
         significant,level,strength,interpretation\n",
    );

    for result in results {
        let significant = match result.significant {
            Some(true) => "yes",
            Some(false) => "no",
            None => UNDEFINED,
        };
        push_row(
            &mut output,
            &[
                escape_field(&result.first),
                escape_field(&result.second),
                escape_field(&result.first_name),
                escape_field(&result.second_name),
                optional_text(&result.label),
                coefficient(&result.coefficient),
                result.observations.to_string(),
                result
                    .degrees_of_freedom
                    .map(|df| df.to_string())
                    .unwrap_or_else(|| UNDEFINED.to_string()),
                t_value(&result.t_statistic),
                statistic(result.p_value),
                significant.to_string(),
                result.level.symbol().to_string(),
                result
                    .strength
                    .map(|s| s.label().to_string())
                    .unwrap_or_else(|| UNDEFINED.to_string()),
                escape_field(&result.interpretation()),
            ],
        );
    }

    output
}
