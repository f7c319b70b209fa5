//! §6.2: the multi-image "image-info" text format — repeated `IMAGE_START`
//! blocks, each describing one image's data/mask/error/PSF filenames, its
//! characteristic scalars, zero or more oversampled-region triples, its
//! image-description parameters, and an optional `FUNCTIONS_START`
//! subsection of local function sets (parsed with the §6.1 grammar).

use crate::config::model_config::{is_function_line, is_x0_line, is_y0_line, parse_param_line};
use crate::config::{numbered_lines, FunctionSetSpec, FunctionSpec, ParamSpec};
use crate::error::{Error, ParseError, ParseErrorKind, Result};
use crate::functions::FunctionKind;

#[derive(Debug, Clone)]
pub struct OversampledRegionBlock {
    pub oversampled_psf_path: String,
    pub oversample_scale: usize,
    pub region_x1: usize,
    pub region_y1: usize,
    pub region_dx: usize,
    pub region_dy: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ImageBlockSpec {
    pub data_path: Option<String>,
    pub mask_path: Option<String>,
    pub error_path: Option<String>,
    pub psf_path: Option<String>,
    pub gain: Option<f64>,
    pub read_noise: Option<f64>,
    pub original_sky: Option<f64>,
    pub exptime: Option<f64>,
    pub n_combined: Option<f64>,
    pub oversampled_regions: Vec<OversampledRegionBlock>,
    pub pixel_scale: Option<ParamSpec>,
    pub image_pa: Option<ParamSpec>,
    pub flux_scale: Option<ParamSpec>,
    pub x0: Option<ParamSpec>,
    pub y0: Option<ParamSpec>,
    pub local_function_sets: Vec<FunctionSetSpec>,
}

#[derive(Debug, Clone, Default)]
pub struct ImageInfoFile {
    pub images: Vec<ImageBlockSpec>,
}

impl ImageInfoFile {
    pub fn parse(text: &str) -> Result<Self> {
        let lines = numbered_lines(text);
        let mut images = Vec::new();

        let mut i = 0usize;
        while i < lines.len() && lines[i].1 != "IMAGE_START" {
            i += 1;
        }
        if i == lines.len() {
            return Err(Error::Parse(ParseError::new(
                1,
                ParseErrorKind::BadImageBlock,
                "no IMAGE_START block found".to_string(),
            )));
        }

        while i < lines.len() {
            if lines[i].1 != "IMAGE_START" {
                return Err(Error::Parse(ParseError::new(
                    lines[i].0,
                    ParseErrorKind::BadImageBlock,
                    format!("expected 'IMAGE_START', got '{}'", lines[i].1),
                )));
            }
            i += 1;
            let (block, next_i) = parse_one_block(&lines, i)?;
            images.push(block);
            i = next_i;
        }

        if images.is_empty() {
            return Err(Error::Parse(ParseError::new(
                1,
                ParseErrorKind::BadImageBlock,
                "no IMAGE_START block found".to_string(),
            )));
        }
        Ok(ImageInfoFile { images })
    }
}

fn parse_one_block(lines: &[(usize, String)], mut i: usize) -> Result<(ImageBlockSpec, usize)> {
    let mut block = ImageBlockSpec::default();

    while i < lines.len() && lines[i].1 != "IMAGE_START" {
        let (line_no, content) = &lines[i];
        let tokens: Vec<&str> = content.split_whitespace().collect();
        let keyword = tokens[0];

        match keyword {
            "DATA" => {
                block.data_path = Some(require_arg(tokens.get(1), *line_no, "DATA")?.to_string());
                i += 1;
            }
            "MASK" => {
                block.mask_path = Some(require_arg(tokens.get(1), *line_no, "MASK")?.to_string());
                i += 1;
            }
            "ERROR" => {
                block.error_path = Some(require_arg(tokens.get(1), *line_no, "ERROR")?.to_string());
                i += 1;
            }
            "PSF" => {
                block.psf_path = Some(require_arg(tokens.get(1), *line_no, "PSF")?.to_string());
                i += 1;
            }
            "GAIN" => {
                block.gain = Some(parse_scalar(tokens.get(1), *line_no, "GAIN")?);
                i += 1;
            }
            "READNOISE" => {
                block.read_noise = Some(parse_scalar(tokens.get(1), *line_no, "READNOISE")?);
                i += 1;
            }
            "ORIGINAL_SKY" => {
                block.original_sky = Some(parse_scalar(tokens.get(1), *line_no, "ORIGINAL_SKY")?);
                i += 1;
            }
            "EXPTIME" => {
                block.exptime = Some(parse_scalar(tokens.get(1), *line_no, "EXPTIME")?);
                i += 1;
            }
            "NCOMBINED" => {
                block.n_combined = Some(parse_scalar(tokens.get(1), *line_no, "NCOMBINED")?);
                i += 1;
            }
            "OVERSAMPLED_PSF" => {
                let psf_path = require_arg(tokens.get(1), *line_no, "OVERSAMPLED_PSF")?.to_string();
                i += 1;
                let (scale_line, scale_content) = lines.get(i).ok_or_else(|| {
                    ParseError::new(
                        *line_no,
                        ParseErrorKind::BadImageBlock,
                        "OVERSAMPLED_PSF must be followed by OVERSAMPLE_SCALE".to_string(),
                    )
                })?;
                let scale_tokens: Vec<&str> = scale_content.split_whitespace().collect();
                if scale_tokens.first() != Some(&"OVERSAMPLE_SCALE") {
                    return Err(Error::Parse(ParseError::new(
                        *scale_line,
                        ParseErrorKind::BadImageBlock,
                        "expected OVERSAMPLE_SCALE".to_string(),
                    )));
                }
                let scale: usize = parse_scalar(scale_tokens.get(1), *scale_line, "OVERSAMPLE_SCALE")?
                    as usize;
                i += 1;

                let (region_line, region_content) = lines.get(i).ok_or_else(|| {
                    ParseError::new(
                        *scale_line,
                        ParseErrorKind::BadImageBlock,
                        "OVERSAMPLE_SCALE must be followed by OVERSAMPLED_REGION".to_string(),
                    )
                })?;
                let region_tokens: Vec<&str> = region_content.split_whitespace().collect();
                if region_tokens.first() != Some(&"OVERSAMPLED_REGION") {
                    return Err(Error::Parse(ParseError::new(
                        *region_line,
                        ParseErrorKind::BadImageBlock,
                        "expected OVERSAMPLED_REGION".to_string(),
                    )));
                }
                let bounds = require_arg(region_tokens.get(1), *region_line, "OVERSAMPLED_REGION")?;
                let (x1, x2, y1, y2) = parse_region_bounds(bounds, *region_line)?;
                i += 1;

                block.oversampled_regions.push(OversampledRegionBlock {
                    oversampled_psf_path: psf_path,
                    oversample_scale: scale,
                    region_x1: x1,
                    region_y1: y1,
                    region_dx: x2 - x1 + 1,
                    region_dy: y2 - y1 + 1,
                });
            }
            "PIXEL_SCALE" => {
                block.pixel_scale = Some(parse_param_line(content, *line_no)?);
                i += 1;
            }
            "IMAGE_PA" => {
                block.image_pa = Some(parse_param_line(content, *line_no)?);
                i += 1;
            }
            "FLUX_SCALE" => {
                block.flux_scale = Some(parse_param_line(content, *line_no)?);
                i += 1;
            }
            "X0" => {
                block.x0 = Some(parse_param_line(content, *line_no)?);
                i += 1;
            }
            "Y0" => {
                block.y0 = Some(parse_param_line(content, *line_no)?);
                i += 1;
            }
            "FUNCTIONS_START" => {
                i += 1;
                let (sets, next_i) = parse_local_function_sets(lines, i)?;
                block.local_function_sets = sets;
                i = next_i;
            }
            other => {
                return Err(Error::Parse(ParseError::new(
                    *line_no,
                    ParseErrorKind::BadImageBlock,
                    format!("unrecognized image-info keyword '{other}'"),
                )));
            }
        }
    }

    if block.data_path.is_none() {
        return Err(Error::Parse(ParseError::new(
            lines.get(i.saturating_sub(1)).map(|l| l.0).unwrap_or(1),
            ParseErrorKind::BadImageBlock,
            "image block has no DATA filename".to_string(),
        )));
    }

    Ok((block, i))
}

fn parse_local_function_sets(
    lines: &[(usize, String)],
    mut i: usize,
) -> Result<(Vec<FunctionSetSpec>, usize)> {
    let mut sets = Vec::new();
    while i < lines.len() && lines[i].1 != "IMAGE_START" && is_x0_line(&lines[i].1) {
        let (x0_line_no, x0_content) = &lines[i];
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
                "X0 line must be immediately followed by a Y0 line".to_string(),
            )));
        }
        let y0 = parse_param_line(y0_content, *y0_line_no)?;
        i += 1;

        let mut functions = Vec::new();
        while i < lines.len() && lines[i].1 != "IMAGE_START" && !is_x0_line(&lines[i].1) {
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
            while i < lines.len()
                && lines[i].1 != "IMAGE_START"
                && !is_x0_line(&lines[i].1)
                && !is_function_line(&lines[i].1)
            {
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
                "local function set has no FUNCTION blocks".to_string(),
            )));
        }
        sets.push(FunctionSetSpec { x0, y0, functions });
    }
    Ok((sets, i))
}

fn require_arg<'a>(tok: Option<&'a &'a str>, line_no: usize, keyword: &str) -> Result<&'a str> {
    tok.copied().ok_or_else(|| {
        Error::Parse(ParseError::new(
            line_no,
            ParseErrorKind::BadImageBlock,
            format!("'{keyword}' requires an argument"),
        ))
    })
}

fn parse_scalar(tok: Option<&&str>, line_no: usize, keyword: &str) -> Result<f64> {
    let s = require_arg(tok, line_no, keyword)?;
    s.parse().map_err(|_| {
        Error::Parse(ParseError::new(
            line_no,
            ParseErrorKind::BadImageBlock,
            format!("non-numeric value for '{keyword}': '{s}'"),
        ))
    })
}

fn parse_region_bounds(s: &str, line_no: usize) -> Result<(usize, usize, usize, usize)> {
    let (x_part, y_part) = s.split_once(',').ok_or_else(|| {
        ParseError::new(
            line_no,
            ParseErrorKind::BadImageBlock,
            format!("expected 'x1:x2,y1:y2', got '{s}'"),
        )
    })?;
    let (x1_s, x2_s) = x_part.split_once(':').ok_or_else(|| {
        ParseError::new(line_no, ParseErrorKind::BadImageBlock, format!("bad x-range '{x_part}'"))
    })?;
    let (y1_s, y2_s) = y_part.split_once(':').ok_or_else(|| {
        ParseError::new(line_no, ParseErrorKind::BadImageBlock, format!("bad y-range '{y_part}'"))
    })?;
    let parse_one = |t: &str| -> Result<usize> {
        t.parse().map_err(|_| {
            Error::Parse(ParseError::new(
                line_no,
                ParseErrorKind::BadImageBlock,
                format!("non-integer region bound '{t}'"),
            ))
        })
    };
    Ok((parse_one(x1_s)?, parse_one(x2_s)?, parse_one(y1_s)?, parse_one(y2_s)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_image_blocks() {
        let text = "\
IMAGE_START
DATA ref.fits
GAIN 1.5
READNOISE 3.0
IMAGE_START
DATA other.fits
PIXEL_SCALE 1.0
IMAGE_PA 0.0
FLUX_SCALE 1.0
X0 25.0
Y0 25.0
";
        let parsed = ImageInfoFile::parse(text).unwrap();
        assert_eq!(parsed.images.len(), 2);
        assert_eq!(parsed.images[0].data_path.as_deref(), Some("ref.fits"));
        assert_eq!(parsed.images[0].gain, Some(1.5));
        assert_eq!(parsed.images[1].x0.as_ref().unwrap().value, 25.0);
    }

    #[test]
    fn oversampled_region_triple_parses() {
        let text = "\
IMAGE_START
DATA ref.fits
OVERSAMPLED_PSF psf_o.fits
OVERSAMPLE_SCALE 5
OVERSAMPLED_REGION 10:20,10:20
";
        let parsed = ImageInfoFile::parse(text).unwrap();
        let region = &parsed.images[0].oversampled_regions[0];
        assert_eq!(region.oversample_scale, 5);
        assert_eq!(region.region_dx, 11);
        assert_eq!(region.region_dy, 11);
    }

    #[test]
    fn local_functions_section_parses() {
        let text = "\
IMAGE_START
DATA ref.fits
FUNCTIONS_START
X0 10
Y0 10
FUNCTION FlatSky
I_sky 1.0
";
        let parsed = ImageInfoFile::parse(text).unwrap();
        assert_eq!(parsed.images[0].local_function_sets.len(), 1);
    }

    #[test]
    fn missing_data_line_is_rejected() {
        let text = "IMAGE_START\nGAIN 1.0\n";
        assert!(ImageInfoFile::parse(text).is_err());
    }
}
