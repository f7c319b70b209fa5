//! §6.1: the model-configuration text format. Top-of-file `OPTION VALUE`
//! pairs, then a sequence of function sets, each an `X0`/`Y0` pair followed
//! by one or more `FUNCTION <name> [LABEL <text>]` blocks and their
//! parameter lines.

use std::collections::HashMap;

use crate::config::numbered_lines;
use crate::error::{Error, ParseError, ParseErrorKind, Result};
use crate::functions::FunctionKind;

/// A parameter's fit-limit annotation, the third (optional) token of a
/// parameter line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamLimit {
    Free,
    Fixed,
    Range(f64, f64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub value: f64,
    pub limit: ParamLimit,
}

#[derive(Debug, Clone)]
pub struct FunctionSpec {
    pub name: String,
    pub label: Option<String>,
    pub params: Vec<ParamSpec>,
}

#[derive(Debug, Clone)]
pub struct FunctionSetSpec {
    pub x0: ParamSpec,
    pub y0: ParamSpec,
    pub functions: Vec<FunctionSpec>,
}

#[derive(Debug, Clone, Default)]
pub struct ModelConfigFile {
    pub options: HashMap<String, f64>,
    pub function_sets: Vec<FunctionSetSpec>,
}

impl ModelConfigFile {
    /// Total flat parameter count this file declares, `2*|sets| +
    /// sum(nparams(f))` (§3).
    pub fn n_params(&self) -> usize {
        self.function_sets
            .iter()
            .map(|s| 2 + s.functions.iter().map(|f| f.params.len()).sum::<usize>())
            .sum()
    }

    /// Overwrite every `ParamSpec::value` in declaration order from a flat
    /// `(X0, Y0, params...)` vector — the same layout `build_function_sets`
    /// assembles its initial theta in. Used by the "save best-fit" path to
    /// persist an evaluated parameter vector back into a re-parseable file.
    pub fn set_values(&mut self, theta: &[f64]) -> Result<()> {
        if theta.len() != self.n_params() {
            return Err(Error::Lifecycle(format!(
                "set_values expected {} entries, got {}",
                self.n_params(),
                theta.len()
            )));
        }
        let mut i = 0usize;
        for set in &mut self.function_sets {
            set.x0.value = theta[i];
            set.y0.value = theta[i + 1];
            i += 2;
            for func in &mut set.functions {
                for p in &mut func.params {
                    p.value = theta[i];
                    i += 1;
                }
            }
        }
        Ok(())
    }

    /// Serialize back to §6.1 text: the same grammar `parse` consumes, so
    /// `ModelConfigFile::parse(&file.to_text())` round-trips (invariant 7).
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let mut option_names: Vec<&String> = self.options.keys().collect();
        option_names.sort();
        for name in option_names {
            out.push_str(&format!("{name} {}\n", self.options[name]));
        }
        for set in &self.function_sets {
            out.push_str(&format!("X0 {}\n", fmt_param(&set.x0)));
            out.push_str(&format!("Y0 {}\n", fmt_param(&set.y0)));
            for func in &set.functions {
                match &func.label {
                    Some(label) => out.push_str(&format!("FUNCTION {} LABEL {label}\n", func.name)),
                    None => out.push_str(&format!("FUNCTION {}\n", func.name)),
                }
                for p in &func.params {
                    out.push_str(&format!("{} {}\n", p.name, fmt_param(p)));
                }
            }
        }
        out
    }

    pub fn parse(text: &str) -> Result<Self> {
        let lines = numbered_lines(text);
        let mut options = HashMap::new();
        let mut function_sets: Vec<FunctionSetSpec> = Vec::new();

        let mut i = 0usize;
        // Leading OPTION VALUE pairs, before the first X0 line.
        while i < lines.len() && !is_x0_line(&lines[i].1) {
            let (line_no, content) = &lines[i];
            let tokens: Vec<&str> = content.split_whitespace().collect();
            if tokens.len() < 2 {
                return Err(Error::Parse(ParseError::new(
                    *line_no,
                    ParseErrorKind::BadOptionLine,
                    format!("expected 'OPTION_NAME VALUE', got '{content}'"),
                )));
            }
            let value: f64 = tokens[1].parse().map_err(|_| {
                ParseError::new(
                    *line_no,
                    ParseErrorKind::BadOptionLine,
                    format!("non-numeric option value '{}'", tokens[1]),
                )
            })?;
            options.insert(tokens[0].to_string(), value);
            i += 1;
        }

        while i < lines.len() {
            let (x0_line_no, x0_content) = &lines[i];
            if !is_x0_line(x0_content) {
                return Err(Error::Parse(ParseError::new(
                    *x0_line_no,
                    ParseErrorKind::BadParameterLine,
                    format!("expected 'X0 ...', got '{x0_content}'"),
                )));
            }
            let x0 = parse_param_line(x0_content, *x0_line_no)?;
            i += 1;

            let (y0_line_no, y0_content) = lines.get(i).ok_or_else(|| {
                ParseError::new(
                    *x0_line_no,
                    ParseErrorKind::IncompleteXYPair,
                    "file ended after X0 line with no following Y0 line".to_string(),
                )
            })?;
            if !is_y0_line(y0_content) {
                return Err(Error::Parse(ParseError::new(
                    *y0_line_no,
                    ParseErrorKind::IncompleteXYPair,
                    format!("X0 line must be immediately followed by a Y0 line, got '{y0_content}'"),
                )));
            }
            let y0 = parse_param_line(y0_content, *y0_line_no)?;
            i += 1;

            let mut functions = Vec::new();
            while i < lines.len() && !is_x0_line(&lines[i].1) {
                let (fn_line_no, fn_content) = &lines[i];
                if !is_function_line(fn_content) {
                    return Err(Error::Parse(ParseError::new(
                        *fn_line_no,
                        ParseErrorKind::NoFunctionSection,
                        format!("expected 'FUNCTION <name>', got '{fn_content}'"),
                    )));
                }
                let tokens: Vec<&str> = fn_content.split_whitespace().collect();
                let name = tokens.get(1).ok_or_else(|| {
                    ParseError::new(*fn_line_no, ParseErrorKind::UnknownFunction, "missing function name")
                })?;
                if FunctionKind::from_name(name).is_none() {
                    return Err(Error::Parse(ParseError::new(
                        *fn_line_no,
                        ParseErrorKind::UnknownFunction,
                        format!("unknown function name '{name}'"),
                    )));
                }
                let label = if tokens.len() >= 4 && tokens[2] == "LABEL" {
                    Some(tokens[3..].join(" "))
                } else {
                    None
                };
                i += 1;

                let mut params = Vec::new();
                while i < lines.len() && !is_x0_line(&lines[i].1) && !is_function_line(&lines[i].1) {
                    let (p_line_no, p_content) = &lines[i];
                    params.push(parse_param_line(p_content, *p_line_no)?);
                    i += 1;
                }
                functions.push(FunctionSpec {
                    name: name.to_string(),
                    label,
                    params,
                });
            }

            if functions.is_empty() {
                return Err(Error::Parse(ParseError::new(
                    *x0_line_no,
                    ParseErrorKind::NoFunctions,
                    "function set has no FUNCTION blocks".to_string(),
                )));
            }
            function_sets.push(FunctionSetSpec { x0, y0, functions });
        }

        if function_sets.is_empty() {
            return Err(Error::Parse(ParseError::new(
                1,
                ParseErrorKind::NoFunctions,
                "configuration file declares no function sets".to_string(),
            )));
        }

        Ok(ModelConfigFile {
            options,
            function_sets,
        })
    }
}

/// Render a `ParamSpec`'s value plus its limit suffix (`"fixed"` or
/// `"LOW,HIGH"`), the part of a parameter line after its name token.
fn fmt_param(p: &ParamSpec) -> String {
    match p.limit {
        ParamLimit::Free => format!("{}", p.value),
        ParamLimit::Fixed => format!("{} fixed", p.value),
        ParamLimit::Range(lo, hi) => format!("{} {lo},{hi}", p.value),
    }
}

pub(crate) fn is_x0_line(s: &str) -> bool {
    s.split_whitespace().next() == Some("X0")
}

pub(crate) fn is_y0_line(s: &str) -> bool {
    s.split_whitespace().next() == Some("Y0")
}

pub(crate) fn is_function_line(s: &str) -> bool {
    s.split_whitespace().next() == Some("FUNCTION")
}

/// Parameter-line grammar (§6.1): `NAME VALUE ["fixed" | LOW,HIGH]`.
pub(crate) fn parse_param_line(content: &str, line_no: usize) -> Result<ParamSpec> {
    let tokens: Vec<&str> = content.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err(Error::Parse(ParseError::new(
            line_no,
            ParseErrorKind::BadParameterLine,
            format!("expected 'NAME VALUE [...]', got '{content}'"),
        )));
    }
    let name = tokens[0].to_string();
    let value: f64 = tokens[1].parse().map_err(|_| {
        ParseError::new(
            line_no,
            ParseErrorKind::BadParameterLine,
            format!("non-numeric value '{}'", tokens[1]),
        )
    })?;

    let limit = if let Some(&token) = tokens.get(2) {
        if token == "fixed" {
            ParamLimit::Fixed
        } else if let Some((lo_s, hi_s)) = token.split_once(',') {
            let lo: f64 = lo_s.parse().map_err(|_| {
                ParseError::new(
                    line_no,
                    ParseErrorKind::BadParameterLine,
                    format!("non-numeric lower limit in '{token}'"),
                )
            })?;
            let hi: f64 = hi_s.parse().map_err(|_| {
                ParseError::new(
                    line_no,
                    ParseErrorKind::BadParameterLine,
                    format!("non-numeric upper limit in '{token}'"),
                )
            })?;
            if !(lo < hi) {
                return Err(Error::Parse(ParseError::new(
                    line_no,
                    ParseErrorKind::BadParameterLine,
                    format!("limits must satisfy LOW < HIGH, got {lo},{hi}"),
                )));
            }
            if !(lo <= value && value <= hi) {
                return Err(Error::Parse(ParseError::new(
                    line_no,
                    ParseErrorKind::BadParameterLine,
                    format!("value {value} outside limits [{lo},{hi}]"),
                )));
            }
            ParamLimit::Range(lo, hi)
        } else {
            return Err(Error::Parse(ParseError::new(
                line_no,
                ParseErrorKind::BadParameterLine,
                format!("expected 'fixed' or 'LOW,HIGH', got '{token}'"),
            )));
        }
    } else {
        ParamLimit::Free
    };

    Ok(ParamSpec { name, value, limit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flat_sky_with_option_header() {
        let text = "\
NCOLS 100
NROWS 100
X0 50
Y0 50
FUNCTION FlatSky
I_sky   100.0   0,1000
";
        let parsed = ModelConfigFile::parse(text).unwrap();
        assert_eq!(parsed.options.get("NCOLS"), Some(&100.0));
        assert_eq!(parsed.function_sets.len(), 1);
        let set = &parsed.function_sets[0];
        assert_eq!(set.x0.value, 50.0);
        assert_eq!(set.functions[0].name, "FlatSky");
        assert_eq!(set.functions[0].params[0].limit, ParamLimit::Range(0.0, 1000.0));
    }

    #[test]
    fn invariant_7_write_then_reparse_round_trips_values_and_limits() {
        let text = "\
NCOLS 100
X0 50
Y0 50
FUNCTION Sersic LABEL bulge
PA 30 0,180
ell 0.2 fixed
n 4.0
I_e 10.0
r_e 5.0
";
        let parsed = ModelConfigFile::parse(text).unwrap();
        let rewritten = parsed.to_text();
        let reparsed = ModelConfigFile::parse(&rewritten).unwrap();

        assert_eq!(parsed.n_params(), reparsed.n_params());
        assert_eq!(reparsed.options.get("NCOLS"), Some(&100.0));
        let set = &reparsed.function_sets[0];
        assert_eq!(set.x0.value, 50.0);
        assert_eq!(set.functions[0].label.as_deref(), Some("bulge"));
        assert_eq!(set.functions[0].params[0].limit, ParamLimit::Range(0.0, 180.0));
        assert_eq!(set.functions[0].params[1].limit, ParamLimit::Fixed);
        for (a, b) in parsed.function_sets[0].functions[0]
            .params
            .iter()
            .zip(set.functions[0].params.iter())
        {
            assert_eq!(a.value, b.value);
        }
    }

    #[test]
    fn set_values_overwrites_in_flat_theta_order() {
        let text = "X0 1\nY0 1\nFUNCTION FlatSky\nI_sky 5.0\n";
        let mut parsed = ModelConfigFile::parse(text).unwrap();
        parsed.set_values(&[10.0, 20.0, 99.0]).unwrap();
        assert_eq!(parsed.function_sets[0].x0.value, 10.0);
        assert_eq!(parsed.function_sets[0].y0.value, 20.0);
        assert_eq!(parsed.function_sets[0].functions[0].params[0].value, 99.0);
    }

    #[test]
    fn missing_y0_is_incomplete_xy_pair_error() {
        let text = "X0 50\nFUNCTION FlatSky\nI_sky 1.0\n";
        let err = ModelConfigFile::parse(text).unwrap_err();
        match err {
            Error::Parse(p) => assert_eq!(p.kind, ParseErrorKind::IncompleteXYPair),
            _ => panic!("expected a parse error"),
        }
    }

    #[test]
    fn fixed_parameter_is_recognized() {
        let text = "X0 1\nY0 1\nFUNCTION FlatSky\nI_sky 5.0 fixed\n";
        let parsed = ModelConfigFile::parse(text).unwrap();
        assert_eq!(
            parsed.function_sets[0].functions[0].params[0].limit,
            ParamLimit::Fixed
        );
    }

    #[test]
    fn unknown_function_name_is_rejected() {
        let text = "X0 1\nY0 1\nFUNCTION NotAFunction\nfoo 1.0\n";
        let err = ModelConfigFile::parse(text).unwrap_err();
        match err {
            Error::Parse(p) => assert_eq!(p.kind, ParseErrorKind::UnknownFunction),
            _ => panic!("expected a parse error"),
        }
    }

    #[test]
    fn label_suffix_is_captured() {
        let text = "X0 1\nY0 1\nFUNCTION Gaussian LABEL bulge\nPA 0\nell 0\nI_0 1\nsigma 1\n";
        let parsed = ModelConfigFile::parse(text).unwrap();
        assert_eq!(
            parsed.function_sets[0].functions[0].label.as_deref(),
            Some("bulge")
        );
    }
}
