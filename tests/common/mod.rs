//! Fixture builders shared by the integration tests.
#![allow(dead_code)]

use animdecode::decoder::chunks::{self, write_chunk, ChunkReader, ACTL, FCTL, FDAT, IDAT, IEND, IHDR, PNG_SIGNATURE};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

pub const RED: [u8; 4] = [255, 0, 0, 255];
pub const GREEN: [u8; 4] = [0, 255, 0, 255];
pub const BLUE: [u8; 4] = [0, 0, 255, 255];
pub const HALF_BLUE: [u8; 4] = [0, 0, 255, 128];
pub const CLEAR: [u8; 4] = [0, 0, 0, 0];

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn solid(width: u32, height: u32, px: [u8; 4]) -> Vec<u8> {
    px.repeat((width * height) as usize)
}

pub fn pixel(rgba: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * width + x) * 4) as usize;
    [rgba[i], rgba[i + 1], rgba[i + 2], rgba[i + 3]]
}

/// Encode RGBA8 pixels as a plain PNG
pub fn encode_png(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(rgba, width, height, ExtendedColorType::Rgba8)
        .unwrap();
    png
}

/// IHDR payload and concatenated IDAT payloads of a plain PNG
fn split_png(png: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut header = Vec::new();
    let mut data = Vec::new();
    for chunk in ChunkReader::new(png).unwrap() {
        let chunk = chunk.unwrap();
        match chunk.tag {
            IHDR => header = chunk.payload.to_vec(),
            IDAT => data.extend_from_slice(chunk.payload),
            _ => {}
        }
    }
    (header, data)
}

#[derive(Clone, Debug)]
pub struct ApngFrame {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
    pub delay_num: u16,
    pub delay_den: u16,
    pub dispose: u8,
    pub blend: u8,
    pub rgba: Vec<u8>,
}

impl ApngFrame {
    /// A solid-color frame shown for `delay_ms`
    pub fn solid(width: u32, height: u32, px: [u8; 4], delay_ms: u16) -> Self {
        Self {
            width,
            height,
            x: 0,
            y: 0,
            delay_num: delay_ms,
            delay_den: 1000,
            dispose: 0,
            blend: 0,
            rgba: solid(width, height, px),
        }
    }

    pub fn at(mut self, x: u32, y: u32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn ops(mut self, dispose: u8, blend: u8) -> Self {
        self.dispose = dispose;
        self.blend = blend;
        self
    }

    pub fn delay(mut self, num: u16, den: u16) -> Self {
        self.delay_num = num;
        self.delay_den = den;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct ApngBuilder {
    pub width: u32,
    pub height: u32,
    pub plays: u32,
    pub frames: Vec<ApngFrame>,
    /// Extra chunks written right after acTL
    pub ancillary: Vec<(chunks::ChunkTag, Vec<u8>)>,
    /// Replace a frame's image data with these bytes
    pub corrupt_frame: Option<usize>,
}

impl ApngBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn frame(mut self, frame: ApngFrame) -> Self {
        self.frames.push(frame);
        self
    }

    pub fn plays(mut self, plays: u32) -> Self {
        self.plays = plays;
        self
    }

    pub fn chunk(mut self, tag: chunks::ChunkTag, payload: &[u8]) -> Self {
        self.ancillary.push((tag, payload.to_vec()));
        self
    }

    pub fn corrupt(mut self, index: usize) -> Self {
        self.corrupt_frame = Some(index);
        self
    }

    /// Assemble the APNG: the first frame is stored in IDAT, the rest in fdAT
    pub fn build(&self) -> Vec<u8> {
        let mut out = PNG_SIGNATURE.to_vec();
        let mut seq = 0u32;

        let encoded: Vec<_> = self
            .frames
            .iter()
            .map(|f| split_png(&encode_png(f.width, f.height, &f.rgba)))
            .collect();

        let mut header = encoded[0].0.clone();
        header[0..4].copy_from_slice(&self.width.to_be_bytes());
        header[4..8].copy_from_slice(&self.height.to_be_bytes());
        write_chunk(&mut out, IHDR, &header).unwrap();

        let mut actl = (self.frames.len() as u32).to_be_bytes().to_vec();
        actl.extend_from_slice(&self.plays.to_be_bytes());
        write_chunk(&mut out, ACTL, &actl).unwrap();

        for (tag, payload) in &self.ancillary {
            write_chunk(&mut out, *tag, payload).unwrap();
        }

        for (index, (frame, (_, data))) in self.frames.iter().zip(&encoded).enumerate() {
            let mut fctl = Vec::with_capacity(26);
            for v in [seq, frame.width, frame.height, frame.x, frame.y] {
                fctl.extend_from_slice(&v.to_be_bytes());
            }
            fctl.extend_from_slice(&frame.delay_num.to_be_bytes());
            fctl.extend_from_slice(&frame.delay_den.to_be_bytes());
            fctl.push(frame.dispose);
            fctl.push(frame.blend);
            write_chunk(&mut out, FCTL, &fctl).unwrap();
            seq += 1;

            let data = if self.corrupt_frame == Some(index) {
                vec![0xde, 0xad, 0xbe, 0xef]
            } else {
                data.clone()
            };

            if index == 0 {
                write_chunk(&mut out, IDAT, &data).unwrap();
            } else {
                let mut fdat = seq.to_be_bytes().to_vec();
                fdat.extend_from_slice(&data);
                write_chunk(&mut out, FDAT, &fdat).unwrap();
                seq += 1;
            }
        }

        write_chunk(&mut out, IEND, &[]).unwrap();
        out
    }
}

/// The synthetic 2-frame sequence on a 4x4 canvas: opaque red for 100 ms, then a
/// 2x2 half-transparent blue square at (1,1) for 200 ms, blended over and
/// cleared afterwards.
pub fn red_blue_apng() -> Vec<u8> {
    ApngBuilder::new(4, 4)
        .frame(ApngFrame::solid(4, 4, RED, 100))
        .frame(ApngFrame::solid(2, 2, HALF_BLUE, 200).at(1, 1).ops(1, 1))
        .build()
}

fn push_u24(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes()[..3]);
}

fn riff_chunk(out: &mut Vec<u8>, fourcc: &[u8; 4], payload: &[u8]) {
    out.extend_from_slice(fourcc);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }
}

/// The complete VP8L chunk (header and padding included) of a lossless WebP
fn lossless_frame_chunk(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
    let mut webp = Vec::new();
    image_webp::WebPEncoder::new(&mut webp)
        .encode(rgba, width, height, image_webp::ColorType::Rgba8)
        .unwrap();

    let mut pos = 12;
    while pos + 8 <= webp.len() {
        let size = u32::from_le_bytes([webp[pos + 4], webp[pos + 5], webp[pos + 6], webp[pos + 7]]) as usize;
        let end = pos + 8 + size + (size & 1);
        if &webp[pos..pos + 4] == b"VP8L" {
            return webp[pos..end.min(webp.len())].to_vec();
        }
        pos = end;
    }
    panic!("encoder produced no VP8L chunk");
}

/// Encode a single lossless still WebP
pub fn encode_webp(width: u32, height: u32, rgba: &[u8]) -> Vec<u8> {
    let mut webp = Vec::new();
    image_webp::WebPEncoder::new(&mut webp)
        .encode(rgba, width, height, image_webp::ColorType::Rgba8)
        .unwrap();
    webp
}

/// Assemble an animated WebP of full-canvas frames drawn without blending.
/// `frames` holds (rgba, duration_ms) pairs.
pub fn animated_webp(width: u32, height: u32, loop_count: u16, frames: &[(Vec<u8>, u32)]) -> Vec<u8> {
    let mut body = b"WEBP".to_vec();

    let mut vp8x = vec![0x10 | 0x02, 0, 0, 0];
    push_u24(&mut vp8x, width - 1);
    push_u24(&mut vp8x, height - 1);
    riff_chunk(&mut body, b"VP8X", &vp8x);

    let mut anim = vec![0, 0, 0, 0];
    anim.extend_from_slice(&loop_count.to_le_bytes());
    riff_chunk(&mut body, b"ANIM", &anim);

    for (rgba, duration) in frames {
        let mut anmf = Vec::new();
        push_u24(&mut anmf, 0);
        push_u24(&mut anmf, 0);
        push_u24(&mut anmf, width - 1);
        push_u24(&mut anmf, height - 1);
        push_u24(&mut anmf, *duration);
        // Do not blend, do not dispose
        anmf.push(0b10);
        anmf.extend_from_slice(&lossless_frame_chunk(width, height, rgba));
        riff_chunk(&mut body, b"ANMF", &anmf);
    }

    let mut out = b"RIFF".to_vec();
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

/// Break the lossless signature of the last frame so only that frame fails to decode
pub fn corrupt_last_webp_frame(mut webp: Vec<u8>) -> Vec<u8> {
    let pos = webp
        .windows(4)
        .rposition(|w| w == b"VP8L")
        .expect("animated WebP has a VP8L frame");
    // fourcc(4) + size(4), then the 0x2f signature byte
    webp[pos + 8] = 0;
    webp
}
