// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Typed views over mode registers
//!
//! Each wrapper holds the raw 32-bit register value and decodes fields on
//! demand. The register file keeps raw bits; these views are built at the
//! point of use.

use bitflags::bitflags;

macro_rules! mode_word {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(flag $flag:ident = $fbit:literal;)*
            $(field $field:ident = $fshift:literal, $fwidth:literal;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name(pub u32);

        impl $name {
            $(
                #[inline(always)]
                pub fn $flag(self) -> bool {
                    (self.0 >> $fbit) & 1 != 0
                }
            )*
            $(
                #[inline(always)]
                pub fn $field(self) -> u32 {
                    (self.0 >> $fshift) & ((1u32 << $fwidth) - 1)
                }
            )*
        }
    };
}

mode_word! {
    /// `fbzColorPath`: color and alpha combine unit configuration
    FbzColorPath {
        flag cc_local_select = 4;
        flag cc_local_select_override = 7;
        flag cc_zero_other = 8;
        flag cc_sub_clocal = 9;
        flag cc_reverse_blend = 13;
        flag cc_invert_output = 16;
        flag cca_zero_other = 17;
        flag cca_sub_clocal = 18;
        flag cca_reverse_blend = 22;
        flag cca_invert_output = 25;
        flag subpixel_adjust = 26;
        flag texture_enable = 27;
        flag rgbzw_clamp = 28;
        field cc_rgb_select = 0, 2;
        field cc_a_select = 2, 2;
        field cca_local_select = 5, 2;
        field cc_mselect = 10, 3;
        field cc_add_aclocal = 14, 2;
        field cca_mselect = 19, 3;
        field cca_add_aclocal = 23, 2;
    }
}

mode_word! {
    /// `alphaMode`: alpha test and alpha blending
    AlphaMode {
        flag alpha_test = 0;
        flag alpha_blend = 4;
        field alpha_function = 1, 3;
        field src_rgb_blend = 8, 4;
        field dst_rgb_blend = 12, 4;
        field src_alpha_blend = 16, 4;
        field dst_alpha_blend = 20, 4;
        field alpha_ref = 24, 8;
    }
}

mode_word! {
    /// `fogMode`
    FogMode {
        flag enable_fog = 0;
        flag fog_add = 1;
        flag fog_mult = 2;
        flag fog_constant = 5;
        flag fog_dither = 6;
        flag fog_zones = 7;
        field fog_zalpha = 3, 2;
    }
}

mode_word! {
    /// `fbzMode`: depth, dithering, masks and buffer selection
    FbzMode {
        flag enable_clipping = 0;
        flag enable_chromakey = 1;
        flag enable_stipple = 2;
        flag wbuffer_select = 3;
        flag enable_depthbuf = 4;
        flag enable_dithering = 8;
        flag rgb_buffer_mask = 9;
        flag aux_buffer_mask = 10;
        flag stipple_pattern = 12;
        flag enable_alpha_mask = 13;
        flag enable_depth_bias = 16;
        flag y_origin = 17;
        flag enable_alpha_planes = 18;
        flag alpha_dither_subtract = 19;
        flag depth_source_compare = 20;
        flag depth_float_select = 21;
        field depth_function = 5, 3;
        field dither_type = 11, 1;
        field draw_buffer = 14, 2;
    }
}

mode_word! {
    /// `lfbMode`: linear frame buffer access
    LfbMode {
        flag enable_pixel_pipeline = 8;
        flag word_swap_writes = 11;
        flag byte_swizzle_writes = 12;
        flag y_origin = 13;
        flag word_swap_reads = 15;
        flag byte_swizzle_reads = 16;
        field write_format = 0, 4;
        field write_buffer_select = 4, 2;
        field read_buffer_select = 6, 2;
        field rgba_lanes = 9, 2;
    }
}

mode_word! {
    /// `chromaRange` (Voodoo 2)
    ChromaRange {
        flag blue_exclusive = 24;
        flag green_exclusive = 25;
        flag red_exclusive = 26;
        flag union_mode = 27;
        flag enable = 28;
    }
}

mode_word! {
    /// `textureMode`: texel format, filtering and the texture combine unit
    TextureMode {
        flag enable_perspective = 0;
        flag minification_filter = 1;
        flag magnification_filter = 2;
        flag clamp_neg_w = 3;
        flag enable_lod_dither = 4;
        flag ncc_table_select = 5;
        flag clamp_s = 6;
        flag clamp_t = 7;
        flag tc_zero_other = 12;
        flag tc_sub_clocal = 13;
        flag tc_reverse_blend = 17;
        flag tc_invert_output = 20;
        flag tca_zero_other = 21;
        flag tca_sub_clocal = 22;
        flag tca_reverse_blend = 26;
        flag tca_invert_output = 29;
        flag seq_8_downld = 31;
        field format = 8, 4;
        field tc_mselect = 14, 3;
        field tc_add_aclocal = 18, 2;
        field tca_mselect = 23, 3;
        field tca_add_aclocal = 27, 2;
    }
}

mode_word! {
    /// `tLOD`: mip-map range, bias and texture-write layout
    TexLod {
        flag lod_odd = 18;
        flag lod_tsplit = 19;
        flag lod_s_is_wider = 20;
        flag multi_base_addr = 24;
        flag tdata_swizzle = 25;
        flag tdata_swap = 26;
        flag tdirect_write = 27;
        field lod_min = 0, 6;
        field lod_max = 6, 6;
        field lod_bias = 12, 6;
        field lod_aspect = 21, 2;
    }
}

mode_word! {
    /// `tDetail`: detail texture blend factor
    TexDetail {
        flag separate_rgba_filter = 21;
        field detail_max = 0, 8;
        field detail_bias = 8, 6;
        field detail_scale = 14, 3;
    }
}

mode_word! {
    /// `fbiInit0`
    FbiInit0 {
        flag vga_passthru = 0;
        flag graphics_reset = 1;
        flag enable_memory_fifo = 13;
    }
}

mode_word! {
    /// `fbiInit1`
    FbiInit1 {
        flag x_video_tiles_bit5 = 24;
        field x_video_tiles = 4, 4;
    }
}

mode_word! {
    /// `fbiInit2`
    FbiInit2 {
        flag enable_triple_buf = 4;
        field video_buffer_offset = 11, 9;
    }
}

mode_word! {
    /// `fbiInit3`
    FbiInit3 {
        flag tri_register_remap = 0;
        flag disable_tmus = 6;
        field yorigin_subtract = 22, 10;
    }
}

mode_word! {
    /// `fbiInit4`
    FbiInit4 {
        field memory_fifo_start_row = 8, 10;
        field memory_fifo_stop_row = 18, 10;
    }
}

mode_word! {
    /// `fbiInit5` (Voodoo 2)
    FbiInit5 {
        field buffer_allocation = 9, 2;
    }
}

mode_word! {
    /// `fbiInit6` (Voodoo 2)
    FbiInit6 {
        flag x_video_tiles_bit0 = 30;
    }
}

mode_word! {
    /// PCI `initEnable` register
    InitEnable {
        flag enable_hw_init = 0;
        flag remap_init_to_dac = 2;
    }
}

bitflags! {
    /// Per-pixel content flags decoded from one LFB write
    ///
    /// The low nibble describes pixel 0, the high nibble pixel 1.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LfbMask: u32 {
        const RGB = 0x01;
        const ALPHA = 0x02;
        const DEPTH = 0x04;
        const DEPTH_MSW = 0x08;
        const RGB_HI = 0x10;
        const ALPHA_HI = 0x20;
        const DEPTH_HI = 0x40;
        const DEPTH_MSW_HI = 0x80;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fbz_mode_fields() {
        let mode = FbzMode((5 << 5) | (1 << 9) | (2 << 14) | (1 << 17));
        assert_eq!(mode.depth_function(), 5);
        assert!(mode.rgb_buffer_mask());
        assert!(!mode.aux_buffer_mask());
        assert_eq!(mode.draw_buffer(), 2);
        assert!(mode.y_origin());
    }

    #[test]
    fn test_texture_mode_combine_fields() {
        let mode = TextureMode((0xa << 8) | (3 << 14) | (1 << 17) | (2 << 27));
        assert_eq!(mode.format(), 0xa);
        assert_eq!(mode.tc_mselect(), 3);
        assert!(mode.tc_reverse_blend());
        assert_eq!(mode.tca_add_aclocal(), 2);
    }

    #[test]
    fn test_tlod_bias_is_six_bits() {
        let lod = TexLod(0x3f << 12 | 0x3f);
        assert_eq!(lod.lod_bias(), 0x3f);
        assert_eq!(lod.lod_min(), 0x3f);
        assert_eq!(lod.lod_max(), 0);
    }

    #[test]
    fn test_lfb_mask_nibbles() {
        let mask = LfbMask::RGB | LfbMask::RGB_HI;
        assert_eq!(mask.bits(), 0x11);
    }
}
