use std::borrow::Cow;

use wgpu::naga::ShaderStage;

/// Compiles a GLSL 450 stage through naga's GLSL frontend.
pub(crate) fn compile_glsl(
    device: &wgpu::Device,
    label: &str,
    source: &'static str,
    stage: ShaderStage,
) -> wgpu::ShaderModule {
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(source),
            stage,
            defines: &[],
        },
    })
}

/// Full-screen triangle; `v_uv` is in texture space with `(0, 0)` top-left.
pub(crate) const FULLSCREEN_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    vec2 pos = positions[gl_VertexIndex];
    v_uv = vec2(pos.x * 0.5 + 0.5, 0.5 - pos.y * 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Point-grid vertex stage: simplex turbulence scaled by `distortion`.
pub(crate) const POINTS_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) in vec3 position;
layout(location = 1) in vec2 uv;
layout(location = 0) out vec2 v_uv;

layout(std140, set = 0, binding = 0) uniform MaterialParams {
    mat4 view_proj;
    vec4 resolution;
    float time;
    float distortion;
    float progress;
    float _padding;
} params;

const float NOISE_FREQUENCY = 0.004;
const float NOISE_SPEED = 0.1;
const float SCATTER = 90.0;
const float DEPTH_SCATTER = 240.0;

vec3 mod289(vec3 x) { return x - floor(x * (1.0 / 289.0)) * 289.0; }
vec4 mod289(vec4 x) { return x - floor(x * (1.0 / 289.0)) * 289.0; }
vec4 permute(vec4 x) { return mod289(((x * 34.0) + 1.0) * x); }
vec4 taylor_inv_sqrt(vec4 r) { return 1.79284291400159 - 0.85373472095314 * r; }

float simplex(vec3 v) {
    const vec2 C = vec2(1.0 / 6.0, 1.0 / 3.0);
    const vec4 D = vec4(0.0, 0.5, 1.0, 2.0);

    vec3 i = floor(v + dot(v, C.yyy));
    vec3 x0 = v - i + dot(i, C.xxx);

    vec3 g = step(x0.yzx, x0.xyz);
    vec3 l = 1.0 - g;
    vec3 i1 = min(g.xyz, l.zxy);
    vec3 i2 = max(g.xyz, l.zxy);

    vec3 x1 = x0 - i1 + C.xxx;
    vec3 x2 = x0 - i2 + C.yyy;
    vec3 x3 = x0 - D.yyy;

    i = mod289(i);
    vec4 p = permute(permute(permute(
                i.z + vec4(0.0, i1.z, i2.z, 1.0))
              + i.y + vec4(0.0, i1.y, i2.y, 1.0))
              + i.x + vec4(0.0, i1.x, i2.x, 1.0));

    float n_ = 0.142857142857;
    vec3 ns = n_ * D.wyz - D.xzx;

    vec4 j = p - 49.0 * floor(p * ns.z * ns.z);
    vec4 x_ = floor(j * ns.z);
    vec4 y_ = floor(j - 7.0 * x_);

    vec4 x = x_ * ns.x + ns.yyyy;
    vec4 y = y_ * ns.x + ns.yyyy;
    vec4 h = 1.0 - abs(x) - abs(y);

    vec4 b0 = vec4(x.xy, y.xy);
    vec4 b1 = vec4(x.zw, y.zw);
    vec4 s0 = floor(b0) * 2.0 + 1.0;
    vec4 s1 = floor(b1) * 2.0 + 1.0;
    vec4 sh = -step(h, vec4(0.0));

    vec4 a0 = b0.xzyw + s0.xzyw * sh.xxyy;
    vec4 a1 = b1.xzyw + s1.xzyw * sh.zzww;

    vec3 p0 = vec3(a0.xy, h.x);
    vec3 p1 = vec3(a0.zw, h.y);
    vec3 p2 = vec3(a1.xy, h.z);
    vec3 p3 = vec3(a1.zw, h.w);

    vec4 norm = taylor_inv_sqrt(vec4(dot(p0, p0), dot(p1, p1), dot(p2, p2), dot(p3, p3)));
    p0 *= norm.x;
    p1 *= norm.y;
    p2 *= norm.z;
    p3 *= norm.w;

    vec4 m = max(0.6 - vec4(dot(x0, x0), dot(x1, x1), dot(x2, x2), dot(x3, x3)), 0.0);
    m = m * m;
    return 42.0 * dot(m * m, vec4(dot(p0, x0), dot(p1, x1), dot(p2, x2), dot(p3, x3)));
}

void main() {
    v_uv = uv;

    vec3 seed = position * NOISE_FREQUENCY + vec3(0.0, 0.0, params.time * NOISE_SPEED);
    vec3 offset = vec3(
        simplex(seed),
        simplex(seed + vec3(17.1, 3.7, 0.0)),
        simplex(seed + vec3(-5.3, 31.7, 0.0))
    );
    vec3 displaced = position;
    displaced.xy += offset.xy * SCATTER * params.distortion;
    displaced.z += offset.z * DEPTH_SCATTER * params.distortion;

    gl_Position = params.view_proj * vec4(displaced, 1.0);
}
";

/// Point-grid fragment stage: cover-corrected cross-fade with near-black discard.
pub(crate) const POINTS_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform MaterialParams {
    mat4 view_proj;
    vec4 resolution;
    float time;
    float distortion;
    float progress;
    float _padding;
} params;

layout(set = 1, binding = 0) uniform sampler source_sampler;
layout(set = 1, binding = 1) uniform texture2D texture_a;
layout(set = 1, binding = 2) uniform texture2D texture_b;

const float DISCARD_THRESHOLD = 0.1;

void main() {
    vec2 uv = (v_uv - vec2(0.5)) * params.resolution.zw + vec2(0.5);
    vec4 a = textureLod(sampler2D(texture_a, source_sampler), uv, 0.0);
    vec4 b = textureLod(sampler2D(texture_b, source_sampler), uv, 0.0);
    vec4 color = mix(a, b, params.progress);

    if (color.r < DISCARD_THRESHOLD && color.g < DISCARD_THRESHOLD && color.b < DISCARD_THRESHOLD) {
        discard;
    }
    outColor = color;
}
";

/// Luminosity high-pass feeding the bloom mips.
pub(crate) const HIGH_PASS_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform HighPassParams {
    float threshold;
    float smooth_width;
    vec2 _padding;
} params;

layout(set = 0, binding = 1) uniform sampler post_sampler;
layout(set = 0, binding = 2) uniform texture2D source_texture;

void main() {
    vec4 texel = textureLod(sampler2D(source_texture, post_sampler), v_uv, 0.0);
    float luma = dot(texel.rgb, vec3(0.299, 0.587, 0.114));
    float alpha = smoothstep(params.threshold, params.threshold + params.smooth_width, luma);
    outColor = mix(vec4(0.0), texel, alpha);
}
";

/// One direction of a separable Gaussian; weights are normalised on the CPU.
pub(crate) const BLUR_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform BlurParams {
    vec2 texel_size;
    vec2 direction;
    int radius;
    int _padding0;
    int _padding1;
    int _padding2;
    vec4 weights[12];
} params;

layout(set = 0, binding = 1) uniform sampler post_sampler;
layout(set = 0, binding = 2) uniform texture2D source_texture;

void main() {
    vec2 step_uv = params.direction * params.texel_size;
    vec3 sum = textureLod(sampler2D(source_texture, post_sampler), v_uv, 0.0).rgb * params.weights[0].x;
    for (int i = 1; i < params.radius; i++) {
        vec2 offset = step_uv * float(i);
        vec3 left = textureLod(sampler2D(source_texture, post_sampler), v_uv - offset, 0.0).rgb;
        vec3 right = textureLod(sampler2D(source_texture, post_sampler), v_uv + offset, 0.0).rgb;
        sum += (left + right) * params.weights[i].x;
    }
    outColor = vec4(sum, 1.0);
}
";

/// Scene plus the weighted sum of every blurred mip.
pub(crate) const COMPOSITE_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform CompositeParams {
    float strength;
    float _padding0;
    float _padding1;
    float _padding2;
    vec4 factors[5];
} params;

layout(set = 0, binding = 1) uniform sampler post_sampler;
layout(set = 0, binding = 2) uniform texture2D scene_texture;
layout(set = 0, binding = 3) uniform texture2D bloom0;
layout(set = 0, binding = 4) uniform texture2D bloom1;
layout(set = 0, binding = 5) uniform texture2D bloom2;
layout(set = 0, binding = 6) uniform texture2D bloom3;
layout(set = 0, binding = 7) uniform texture2D bloom4;

void main() {
    vec3 scene = textureLod(sampler2D(scene_texture, post_sampler), v_uv, 0.0).rgb;
    vec3 bloom = params.factors[0].x * textureLod(sampler2D(bloom0, post_sampler), v_uv, 0.0).rgb
        + params.factors[1].x * textureLod(sampler2D(bloom1, post_sampler), v_uv, 0.0).rgb
        + params.factors[2].x * textureLod(sampler2D(bloom2, post_sampler), v_uv, 0.0).rgb
        + params.factors[3].x * textureLod(sampler2D(bloom3, post_sampler), v_uv, 0.0).rgb
        + params.factors[4].x * textureLod(sampler2D(bloom4, post_sampler), v_uv, 0.0).rgb;
    outColor = vec4(scene + params.strength * bloom, 1.0);
}
";

/// Clip frame drawn over the composite with the clip's opacity.
pub(crate) const OVERLAY_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform OverlayParams {
    vec4 cover;
    float opacity;
    float _padding0;
    float _padding1;
    float _padding2;
} params;

layout(set = 0, binding = 1) uniform sampler frame_sampler;
layout(set = 1, binding = 0) uniform texture2D frame_texture;

void main() {
    // Frames are uploaded bottom row first.
    vec2 uv = vec2(v_uv.x, 1.0 - v_uv.y);
    uv = (uv - vec2(0.5)) * params.cover.zw + vec2(0.5);
    vec4 color = textureLod(sampler2D(frame_texture, frame_sampler), uv, 0.0);
    outColor = vec4(color.rgb, params.opacity);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [&str; 7] = [
        FULLSCREEN_VERTEX_GLSL,
        POINTS_VERTEX_GLSL,
        POINTS_FRAGMENT_GLSL,
        HIGH_PASS_FRAGMENT_GLSL,
        BLUR_FRAGMENT_GLSL,
        COMPOSITE_FRAGMENT_GLSL,
        OVERLAY_FRAGMENT_GLSL,
    ];

    #[test]
    fn every_stage_targets_glsl_450() {
        for source in ALL {
            assert!(source.starts_with("#version 450\n"));
            assert!(source.contains("void main()"));
        }
    }

    #[test]
    fn point_stages_share_the_uniform_block() {
        let block = |source: &str| {
            let start = source.find("uniform MaterialParams").expect("block");
            let end = source[start..].find("} params;").expect("block end");
            source[start..start + end].to_string()
        };
        assert_eq!(block(POINTS_VERTEX_GLSL), block(POINTS_FRAGMENT_GLSL));
    }

    #[test]
    fn discard_threshold_matches_cpu_mirror() {
        let expected = format!(
            "const float DISCARD_THRESHOLD = {:?};",
            crate::gpu::DISCARD_THRESHOLD
        );
        assert!(POINTS_FRAGMENT_GLSL.contains(&expected));
    }

    #[test]
    fn blur_weights_fit_the_largest_kernel() {
        let largest = *crate::gpu::KERNEL_RADII.iter().max().unwrap();
        let declared = format!("vec4 weights[{}];", crate::gpu::MAX_KERNEL_WEIGHTS);
        assert!(BLUR_FRAGMENT_GLSL.contains(&declared));
        assert!(largest as usize <= crate::gpu::MAX_KERNEL_WEIGHTS);
    }
}
