//! Native GeoTIFF I/O built on the `tiff` crate
//!
//! Reads single-band grayscale TIFFs of any integer or float sample type,
//! recovering the geotransform from the ModelPixelScale + ModelTiepoint
//! tags and the nodata sentinel from the GDAL_NODATA ASCII tag. Writing is
//! supported for the cell types the pipeline emits (u8, u16, u32, f32).

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{self, ColorType};
use tiff::encoder::{TiffEncoder, TiffValue};
use tiff::tags::Tag;

const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_GDAL_NODATA: u16 = 42113;

/// Cell types the native encoder can write, with their TIFF color type.
pub trait GeoTiffPixel: RasterElement
where
    [Self]: TiffValue,
{
    type Color: ColorType<Inner = Self>;
}

impl GeoTiffPixel for u8 {
    type Color = colortype::Gray8;
}
impl GeoTiffPixel for u16 {
    type Color = colortype::Gray16;
}
impl GeoTiffPixel for u32 {
    type Color = colortype::Gray32;
}
impl GeoTiffPixel for f32 {
    type Color = colortype::Gray32Float;
}

fn tiff_err(context: &str, e: impl std::fmt::Display) -> Error {
    Error::Other(format!("{}: {}", context, e))
}

/// Read a single-band GeoTIFF into a raster, casting samples to `T`.
pub fn read_geotiff<T, P>(path: P, _band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    let mut decoder = Decoder::new(file).map_err(|e| tiff_err("TIFF decode error", e))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| tiff_err("Cannot read dimensions", e))?;
    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| tiff_err("Cannot read image data", e))?;

    fn cast_all<S: Copy, T: RasterElement>(buf: &[S]) -> Vec<T>
    where
        S: num_traits::NumCast,
    {
        buf.iter()
            .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
            .collect()
    }

    let data: Vec<T> = match result {
        DecodingResult::U8(buf) => cast_all(&buf),
        DecodingResult::U16(buf) => cast_all(&buf),
        DecodingResult::U32(buf) => cast_all(&buf),
        DecodingResult::I8(buf) => cast_all(&buf),
        DecodingResult::I16(buf) => cast_all(&buf),
        DecodingResult::I32(buf) => cast_all(&buf),
        DecodingResult::F32(buf) => cast_all(&buf),
        DecodingResult::F64(buf) => cast_all(&buf),
        _ => {
            return Err(Error::UnsupportedDataType(
                "Unsupported TIFF pixel format".to_string(),
            ))
        }
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    if let Some(nodata) = read_nodata(&mut decoder) {
        raster.set_nodata(num_traits::cast(nodata));
    }

    Ok(raster)
}

/// Geotransform from ModelPixelScale + ModelTiepoint, when both are present
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Option<GeoTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::Unknown(TAG_MODEL_PIXEL_SCALE))
        .ok()?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::Unknown(TAG_MODEL_TIEPOINT))
        .ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint is [I, J, K, X, Y, Z]: raster point (I, J) maps to model (X, Y)
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f64> {
    let text = decoder
        .get_tag_ascii_string(Tag::Unknown(TAG_GDAL_NODATA))
        .ok()?;
    text.trim().trim_end_matches('\0').parse().ok()
}

/// Write a raster as a single-band GeoTIFF with georeference and nodata tags.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P) -> Result<()>
where
    T: GeoTiffPixel + std::fmt::Display,
    P: AsRef<Path>,
    [T]: TiffValue,
{
    let file = BufWriter::new(File::create(path.as_ref())?);
    let mut encoder = TiffEncoder::new(file).map_err(|e| tiff_err("TIFF encoder error", e))?;

    let (rows, cols) = raster.shape();
    let mut image = encoder
        .new_image::<T::Color>(cols as u32, rows as u32)
        .map_err(|e| tiff_err("Cannot create TIFF image", e))?;

    if let Some(gt) = raster.transform() {
        let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
        image
            .encoder()
            .write_tag(Tag::Unknown(TAG_MODEL_PIXEL_SCALE), &scale[..])
            .map_err(|e| tiff_err("Cannot write pixel scale tag", e))?;

        let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
        image
            .encoder()
            .write_tag(Tag::Unknown(TAG_MODEL_TIEPOINT), &tiepoint[..])
            .map_err(|e| tiff_err("Cannot write tiepoint tag", e))?;
    }

    if let Some(nodata) = raster.nodata() {
        let text = format!("{}", nodata);
        image
            .encoder()
            .write_tag(Tag::Unknown(TAG_GDAL_NODATA), text.as_str())
            .map_err(|e| tiff_err("Cannot write nodata tag", e))?;
    }

    let data: Vec<T> = raster.data().iter().copied().collect();
    image
        .write_data(&data)
        .map_err(|e| tiff_err("Cannot write image data", e))?;

    Ok(())
}
