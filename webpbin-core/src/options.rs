//! Option types shared by the encoder and decoder.

use std::ffi::OsString;
use std::fmt::Display;

use crate::error::{Result, WebpError};

/// Rectangle cut from the source before any other processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crop {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Crop {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(WebpError::InvalidOption(format!(
                "crop size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }

    pub(crate) fn push_args(&self, args: &mut Vec<OsString>) {
        push_flag(args, "-crop");
        for value in [self.x, self.y, self.width, self.height] {
            args.push(value.to_string().into());
        }
    }
}

/// Target size. A zero dimension is derived from the other one, keeping
/// the aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resize {
    pub width: u32,
    pub height: u32,
}

impl Resize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.width == 0 && self.height == 0 {
            return Err(WebpError::InvalidOption(
                "resize needs at least one non-zero dimension".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn push_args(&self, args: &mut Vec<OsString>) {
        push_flag(args, "-resize");
        args.push(self.width.to_string().into());
        args.push(self.height.to_string().into());
    }
}

/// How chatty the tool is on stderr.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    #[default]
    Normal,
    Quiet,
    Verbose,
}

impl LogLevel {
    pub(crate) fn push_args(&self, args: &mut Vec<OsString>) {
        match self {
            Self::Normal => {}
            Self::Quiet => push_flag(args, "-quiet"),
            Self::Verbose => push_flag(args, "-v"),
        }
    }
}

pub(crate) fn push_flag(args: &mut Vec<OsString>, flag: &str) {
    args.push(OsString::from(flag));
}

pub(crate) fn push_value(args: &mut Vec<OsString>, flag: &str, value: impl Display) {
    args.push(OsString::from(flag));
    args.push(OsString::from(value.to_string()));
}

/// Fails unless `value` lies in `0..=max`.
pub(crate) fn check_range(name: &str, value: f32, max: f32) -> Result<()> {
    if !(0.0..=max).contains(&value) {
        return Err(WebpError::InvalidOption(format!(
            "{name} must be between 0 and {max}, got {value}"
        )));
    }
    Ok(())
}
