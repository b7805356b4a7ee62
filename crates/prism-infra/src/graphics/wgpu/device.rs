// Copyright 2025 eraflo
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

use super::conversions::{binding_size, IntoWgpu};
use prism_core::native::{
    ComputePassRecord, GpuApi, GpuBinding, GpuBufferDescriptor, GpuComputePipelineDescriptor,
    GpuDraw, GpuHandle, GpuLayout, GpuRenderPipelineDescriptor, GpuTextureDescriptor,
    NativeError, RenderPassRecord,
};
use prism_core::renderer::api::{BindGroupLayoutEntry, SamplerParams, TextureFormat};
use std::borrow::Cow;
use std::collections::HashMap;
use wgpu::util::DeviceExt;

/// Any object owned by a [`WgpuDevice`], keyed by handle.
#[derive(Debug)]
enum WgpuObject {
    Buffer(wgpu::Buffer),
    Texture(wgpu::Texture),
    TextureView(wgpu::TextureView),
    Sampler(wgpu::Sampler),
    ShaderModule(wgpu::ShaderModule),
    BindGroupLayout(wgpu::BindGroupLayout),
    BindGroup(wgpu::BindGroup),
    RenderPipeline(wgpu::RenderPipeline),
    ComputePipeline(wgpu::ComputePipeline),
}

impl WgpuObject {
    fn kind(&self) -> &'static str {
        match self {
            WgpuObject::Buffer(_) => "buffer",
            WgpuObject::Texture(_) => "texture",
            WgpuObject::TextureView(_) => "texture view",
            WgpuObject::Sampler(_) => "sampler",
            WgpuObject::ShaderModule(_) => "shader module",
            WgpuObject::BindGroupLayout(_) => "bind group layout",
            WgpuObject::BindGroup(_) => "bind group",
            WgpuObject::RenderPipeline(_) => "render pipeline",
            WgpuObject::ComputePipeline(_) => "compute pipeline",
        }
    }
}

/// Looks up a handle and matches it against one object variant.
macro_rules! lookup {
    ($self:ident, $handle:expr, $variant:ident) => {
        match $self.objects.get(&$handle) {
            Some(WgpuObject::$variant(object)) => Ok(object),
            Some(other) => Err(NativeError::Validation(format!(
                "handle {} is a {}, expected a {}",
                $handle.0,
                other.kind(),
                stringify!($variant)
            ))),
            None => Err(NativeError::InvalidHandle($handle.0)),
        }
    };
}

/// The surface texture acquired for the current frame.
struct Frame {
    view: GpuHandle,
    texture: wgpu::SurfaceTexture,
}

/// A [`GpuApi`] implementation on top of a real WGPU device, queue and surface.
///
/// Objects live in a handle map; dropping the map entry drops the WGPU object.
/// Synchronous buffer readback is not offered: WGPU maps buffers
/// asynchronously, so [`GpuApi::read_buffer`] returns `None`.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    format: TextureFormat,
    adapter_name: String,
    adapter_backend: wgpu::Backend,
    objects: HashMap<GpuHandle, WgpuObject>,
    next_handle: u64,
    frame: Option<Frame>,
}

impl WgpuDevice {
    pub(crate) fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
        format: TextureFormat,
        adapter_info: wgpu::AdapterInfo,
    ) -> Self {
        Self {
            device,
            queue,
            surface,
            config,
            format,
            adapter_name: adapter_info.name,
            adapter_backend: adapter_info.backend,
            objects: HashMap::new(),
            next_handle: 1,
            frame: None,
        }
    }

    fn insert(&mut self, object: WgpuObject) -> GpuHandle {
        let handle = GpuHandle(self.next_handle);
        self.next_handle += 1;
        self.objects.insert(handle, object);
        handle
    }

    fn create_pipeline_layout(
        &self,
        label: &str,
        layout: &GpuLayout,
    ) -> Result<Option<wgpu::PipelineLayout>, NativeError> {
        let GpuLayout::Explicit(handles) = layout else {
            return Ok(None);
        };
        let layouts = handles
            .iter()
            .map(|&handle| lookup!(self, handle, BindGroupLayout))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(self.device.create_pipeline_layout(
            &wgpu::PipelineLayoutDescriptor {
                label: Some(label),
                bind_group_layouts: &layouts,
                immediate_size: 0,
            },
        )))
    }

    fn acquire_frame(&mut self) -> Result<wgpu::SurfaceTexture, NativeError> {
        match self.surface.get_current_texture() {
            Ok(texture) => Ok(texture),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("WgpuDevice: Surface lost or outdated, reconfiguring.");
                self.surface.configure(&self.device, &self.config);
                self.surface
                    .get_current_texture()
                    .map_err(|e| NativeError::Surface(e.to_string()))
            }
            Err(e) => Err(NativeError::Surface(e.to_string())),
        }
    }
}

impl GpuApi for WgpuDevice {
    fn describe(&self) -> String {
        format!("{} ({:?})", self.adapter_name, self.adapter_backend)
    }

    fn surface_format(&self) -> TextureFormat {
        self.format
    }

    fn configure_surface(&mut self, width: u32, height: u32) {
        self.config.width = width.max(1);
        self.config.height = height.max(1);
        log::info!(
            "WgpuDevice: Reconfiguring surface to {}x{}",
            self.config.width,
            self.config.height
        );
        self.surface.configure(&self.device, &self.config);
    }

    // --- Buffers ---

    fn create_buffer(&mut self, desc: &GpuBufferDescriptor<'_>) -> Result<GpuHandle, NativeError> {
        // Queue writes move whole words, so stores are word-aligned.
        let size = wgpu::util::align_to(desc.size.max(1), wgpu::COPY_BUFFER_ALIGNMENT);
        let usage = desc.usage.into_wgpu();
        let buffer = match desc.contents {
            Some(contents) => {
                let mut bytes = contents.to_vec();
                bytes.resize(size as usize, 0);
                self.device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(desc.label),
                        contents: &bytes,
                        usage,
                    })
            }
            None => self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(desc.label),
                size,
                usage,
                mapped_at_creation: false,
            }),
        };
        log::debug!(
            "WgpuDevice: Created buffer '{}' ({} bytes, usage {:?})",
            desc.label,
            size,
            usage
        );
        Ok(self.insert(WgpuObject::Buffer(buffer)))
    }

    fn write_buffer(
        &mut self,
        buffer: GpuHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), NativeError> {
        if offset % wgpu::COPY_BUFFER_ALIGNMENT != 0 {
            return Err(NativeError::Validation(format!(
                "buffer write offset {offset} is not a multiple of {}",
                wgpu::COPY_BUFFER_ALIGNMENT
            )));
        }
        let target = lookup!(self, buffer, Buffer)?;
        let padded = wgpu::util::align_to(data.len() as u64, wgpu::COPY_BUFFER_ALIGNMENT);
        if padded == data.len() as u64 {
            self.queue.write_buffer(target, offset, data);
        } else if offset + padded <= target.size() {
            let mut bytes = data.to_vec();
            bytes.resize(padded as usize, 0);
            self.queue.write_buffer(target, offset, &bytes);
        } else {
            return Err(NativeError::Validation(format!(
                "unaligned write of {} bytes at {offset} overruns the buffer",
                data.len()
            )));
        }
        Ok(())
    }

    fn read_buffer(&mut self, _buffer: GpuHandle) -> Option<Vec<u8>> {
        None
    }

    // --- Textures and samplers ---

    fn create_texture(
        &mut self,
        desc: &GpuTextureDescriptor<'_>,
    ) -> Result<GpuHandle, NativeError> {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(desc.label),
            size: wgpu::Extent3d {
                width: desc.width.max(1),
                height: desc.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: desc.sample_count.max(1),
            dimension: wgpu::TextureDimension::D2,
            format: desc.format.into_wgpu(),
            usage: desc.usage.into_wgpu(),
            view_formats: &[],
        });
        log::debug!(
            "WgpuDevice: Created texture '{}' ({}x{}, {:?}, {} samples)",
            desc.label,
            desc.width,
            desc.height,
            desc.format,
            desc.sample_count
        );
        Ok(self.insert(WgpuObject::Texture(texture)))
    }

    fn create_texture_view(&mut self, texture: GpuHandle) -> Result<GpuHandle, NativeError> {
        let view = lookup!(self, texture, Texture)?
            .create_view(&wgpu::TextureViewDescriptor::default());
        Ok(self.insert(WgpuObject::TextureView(view)))
    }

    fn write_texture(
        &mut self,
        texture: GpuHandle,
        data: &[u8],
        width: u32,
        height: u32,
        bytes_per_row: u32,
    ) -> Result<(), NativeError> {
        let target = lookup!(self, texture, Texture)?;
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: target,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn create_sampler(&mut self, params: &SamplerParams) -> Result<GpuHandle, NativeError> {
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Prism Sampler"),
            address_mode_u: params.address_mode_u.into_wgpu(),
            address_mode_v: params.address_mode_v.into_wgpu(),
            mag_filter: params.mag_filter.into_wgpu(),
            min_filter: params.min_filter.into_wgpu(),
            ..Default::default()
        });
        Ok(self.insert(WgpuObject::Sampler(sampler)))
    }

    // --- Shaders and pipelines ---

    fn create_shader_module(
        &mut self,
        label: &str,
        source: &str,
    ) -> Result<GpuHandle, NativeError> {
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(Cow::Owned(source.to_string())),
            });
        let info = pollster::block_on(module.get_compilation_info());
        let errors: Vec<String> = info
            .messages
            .iter()
            .filter(|m| m.message_type == wgpu::CompilationMessageType::Error)
            .map(|m| m.message.clone())
            .collect();
        if !errors.is_empty() {
            return Err(NativeError::Compile(errors.join("\n")));
        }
        log::debug!("WgpuDevice: Compiled shader module '{label}'");
        Ok(self.insert(WgpuObject::ShaderModule(module)))
    }

    fn create_bind_group_layout(
        &mut self,
        label: &str,
        entries: &[BindGroupLayoutEntry],
    ) -> Result<GpuHandle, NativeError> {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = entries
            .iter()
            .map(|entry| wgpu::BindGroupLayoutEntry {
                binding: entry.binding,
                visibility: entry.visibility.into_wgpu(),
                ty: entry.ty.into_wgpu(),
                count: None,
            })
            .collect();
        let layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &entries,
            });
        Ok(self.insert(WgpuObject::BindGroupLayout(layout)))
    }

    fn create_render_pipeline(
        &mut self,
        desc: &GpuRenderPipelineDescriptor<'_>,
    ) -> Result<GpuHandle, NativeError> {
        let module = lookup!(self, desc.module, ShaderModule)?;
        let layout = self.create_pipeline_layout(desc.label, &desc.layout)?;

        let attributes: Vec<Vec<wgpu::VertexAttribute>> = desc
            .vertex_layouts
            .iter()
            .map(|layout| {
                layout
                    .attributes
                    .iter()
                    .map(|attr| wgpu::VertexAttribute {
                        format: attr.format.into_wgpu(),
                        offset: attr.offset,
                        shader_location: attr.location,
                    })
                    .collect()
            })
            .collect();
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = desc
            .vertex_layouts
            .iter()
            .zip(&attributes)
            .map(|(layout, attributes)| wgpu::VertexBufferLayout {
                array_stride: layout.stride,
                step_mode: layout.step_mode.into_wgpu(),
                attributes,
            })
            .collect();

        let cull_mode = desc.cull_mode.and_then(|mode| {
            let face: Option<wgpu::Face> = mode.into_wgpu();
            if face.is_none() {
                log::warn!(
                    "WgpuDevice: Pipeline '{}' asks to cull {:?}, which WGPU cannot express; culling disabled.",
                    desc.label,
                    mode
                );
            }
            face
        });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(desc.label),
                layout: layout.as_ref(),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some(desc.vertex_entry),
                    buffers: &buffers,
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some(desc.fragment_entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: desc.color_format.into_wgpu(),
                        blend: desc.blend.map(IntoWgpu::into_wgpu),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: desc.topology.into_wgpu(),
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode,
                    ..Default::default()
                },
                depth_stencil: desc.depth.map(|depth| wgpu::DepthStencilState {
                    format: depth.format.into_wgpu(),
                    depth_write_enabled: true,
                    depth_compare: depth.compare.into_wgpu(),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: desc.sample_count.max(1),
                    ..Default::default()
                },
                multiview_mask: None,
                cache: None,
            });
        log::info!("WgpuDevice: Created render pipeline '{}'", desc.label);
        Ok(self.insert(WgpuObject::RenderPipeline(pipeline)))
    }

    fn create_compute_pipeline(
        &mut self,
        desc: &GpuComputePipelineDescriptor<'_>,
    ) -> Result<GpuHandle, NativeError> {
        let module = lookup!(self, desc.module, ShaderModule)?;
        let layout = self.create_pipeline_layout(desc.label, &desc.layout)?;
        let pipeline = self
            .device
            .create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(desc.label),
                layout: layout.as_ref(),
                module,
                entry_point: Some(desc.entry_point),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            });
        log::info!("WgpuDevice: Created compute pipeline '{}'", desc.label);
        Ok(self.insert(WgpuObject::ComputePipeline(pipeline)))
    }

    fn pipeline_bind_group_layout(
        &mut self,
        pipeline: GpuHandle,
        index: u32,
    ) -> Result<GpuHandle, NativeError> {
        let layout = match self.objects.get(&pipeline) {
            Some(WgpuObject::RenderPipeline(p)) => p.get_bind_group_layout(index),
            Some(WgpuObject::ComputePipeline(p)) => p.get_bind_group_layout(index),
            Some(other) => {
                return Err(NativeError::Validation(format!(
                    "handle {} is a {}, expected a pipeline",
                    pipeline.0,
                    other.kind()
                )))
            }
            None => return Err(NativeError::InvalidHandle(pipeline.0)),
        };
        Ok(self.insert(WgpuObject::BindGroupLayout(layout)))
    }

    fn create_bind_group(
        &mut self,
        label: &str,
        layout: GpuHandle,
        entries: &[(u32, GpuBinding)],
    ) -> Result<GpuHandle, NativeError> {
        let group = {
            let layout = lookup!(self, layout, BindGroupLayout)?;
            let mut resolved = Vec::with_capacity(entries.len());
            for (binding, resource) in entries {
                let resource = match resource {
                    GpuBinding::Buffer { buffer, offset, .. } => {
                        wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer: lookup!(self, *buffer, Buffer)?,
                            offset: *offset,
                            size: binding_size(resource),
                        })
                    }
                    GpuBinding::TextureView(view) => {
                        wgpu::BindingResource::TextureView(lookup!(self, *view, TextureView)?)
                    }
                    GpuBinding::Sampler(sampler) => {
                        wgpu::BindingResource::Sampler(lookup!(self, *sampler, Sampler)?)
                    }
                };
                resolved.push(wgpu::BindGroupEntry {
                    binding: *binding,
                    resource,
                });
            }
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout,
                entries: &resolved,
            })
        };
        Ok(self.insert(WgpuObject::BindGroup(group)))
    }

    fn release(&mut self, handle: GpuHandle) {
        if self.frame.as_ref().is_some_and(|frame| frame.view == handle) {
            // Dropping an unpresented surface texture discards the frame.
            self.frame = None;
        }
        match self.objects.remove(&handle) {
            Some(WgpuObject::Buffer(buffer)) => buffer.destroy(),
            Some(WgpuObject::Texture(texture)) => texture.destroy(),
            Some(_) | None => {}
        }
    }

    // --- Frames ---

    fn acquire_surface_view(&mut self) -> Result<GpuHandle, NativeError> {
        if let Some(frame) = self.frame.take() {
            log::warn!("WgpuDevice: Previous frame was never presented; presenting it now.");
            self.objects.remove(&frame.view);
            frame.texture.present();
        }
        let texture = self.acquire_frame()?;
        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let handle = self.insert(WgpuObject::TextureView(view));
        self.frame = Some(Frame {
            view: handle,
            texture,
        });
        Ok(handle)
    }

    fn submit_render_pass(&mut self, pass: &RenderPassRecord) -> Result<(), NativeError> {
        let pipeline = lookup!(self, pass.pipeline, RenderPipeline)?;
        let color_view = lookup!(self, pass.color.view, TextureView)?;
        let resolve_target = pass
            .color
            .resolve_target
            .map(|view| lookup!(self, view, TextureView))
            .transpose()?;
        let depth_view = pass
            .depth
            .map(|depth| lookup!(self, depth.view, TextureView))
            .transpose()?;
        let vertex_buffers = pass
            .vertex_buffers
            .iter()
            .map(|&(slot, buffer)| lookup!(self, buffer, Buffer).map(|b| (slot, b)))
            .collect::<Result<Vec<_>, _>>()?;
        let bind_groups = pass
            .bind_groups
            .iter()
            .map(|&(index, group)| lookup!(self, group, BindGroup).map(|g| (index, g)))
            .collect::<Result<Vec<_>, _>>()?;
        let index_buffer = pass
            .index_buffer
            .map(|(buffer, format)| lookup!(self, buffer, Buffer).map(|b| (b, format)))
            .transpose()?;

        let [r, g, b, a] = pass.color.clear;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Prism Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Prism Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: pass.depth.zip(depth_view).map(|(depth, view)| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(depth.depth_clear),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: depth.stencil_clear.map(|stencil| wgpu::Operations {
                            load: wgpu::LoadOp::Clear(stencil),
                            store: wgpu::StoreOp::Store,
                        }),
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(pipeline);
            for (slot, buffer) in &vertex_buffers {
                render_pass.set_vertex_buffer(*slot, buffer.slice(..));
            }
            for (index, group) in &bind_groups {
                render_pass.set_bind_group(*index, *group, &[]);
            }
            if let Some((buffer, format)) = index_buffer {
                render_pass.set_index_buffer(buffer.slice(..), format.into_wgpu());
            }
            match pass.draw {
                Some(GpuDraw::Indexed { count, instances }) => {
                    render_pass.draw_indexed(0..count, 0, 0..instances);
                }
                Some(GpuDraw::NonIndexed { count, instances }) => {
                    render_pass.draw(0..count, 0..instances);
                }
                None => {}
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn submit_compute_pass(&mut self, pass: &ComputePassRecord) -> Result<(), NativeError> {
        let pipeline = lookup!(self, pass.pipeline, ComputePipeline)?;
        let bind_groups = pass
            .bind_groups
            .iter()
            .map(|&(index, group)| lookup!(self, group, BindGroup).map(|g| (index, g)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Prism Compute Encoder"),
            });
        {
            let mut compute_pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Prism Compute Pass"),
                timestamp_writes: None,
            });
            compute_pass.set_pipeline(pipeline);
            for (index, group) in &bind_groups {
                compute_pass.set_bind_group(*index, *group, &[]);
            }
            let [x, y, z] = pass.workgroups;
            compute_pass.dispatch_workgroups(x, y, z);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn present(&mut self) {
        if let Some(frame) = self.frame.take() {
            self.objects.remove(&frame.view);
            frame.texture.present();
        }
    }
}
