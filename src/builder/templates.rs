//! Shell templates for generated build scripts.
//!
//! Every script starts with [`DRIVER_SOURCE`], continues with one family
//! kernel section that leaves a header tree at `{{kernel_dir}}`, and ends
//! with [`MODULE`] and/or [`PROBE`] when those artifacts were requested.
//! Scripts run under `set -euo pipefail`; the first failing command aborts.

use crate::script::Section;

/// Recreate the staging directory and unpack the driver source into it.
pub const DRIVER_SOURCE: Section = Section {
    name: "driver-source",
    body: r#"#!/bin/bash
set -xeuo pipefail

rm -rf {{driver_build_dir}}
mkdir -p {{driver_build_dir}}
rm -rf /tmp/module-download
mkdir -p /tmp/module-download

curl --silent -SL {{module_download_url}} | tar -xzf - -C /tmp/module-download
mv /tmp/module-download/*/driver/* {{driver_build_dir}}
"#,
};

/// Fetch Debian `.deb` header packages and install their trees.
pub const DEBIAN_KERNEL: Section = Section {
    name: "debian-kernel",
    body: r#"rm -rf /tmp/kernel-download
mkdir -p /tmp/kernel-download
cd /tmp/kernel-download
for url in {{kernel_download_urls}}; do
    curl --silent -o kernel.deb -SL "$url"
    ar x kernel.deb
    tar -xf data.tar.*
    rm -f kernel.deb data.tar.* control.tar.* debian-binary
done
ls -la /tmp/kernel-download

cp -r usr/* /usr
cp -r lib/* /lib

cd /usr/src
sourcedir=$(find . -type d -name "linux-headers-*{{architecture}}" | head -n 1 | xargs readlink -f)
ln -sfn "$sourcedir" {{kernel_dir}}
"#,
};

/// Fetch and prepare an upstream kernel source tree.
pub const VANILLA_KERNEL: Section = Section {
    name: "vanilla-kernel",
    body: r#"rm -rf /tmp/kernel-download
mkdir -p /tmp/kernel-download
cd /tmp/kernel-download
for url in {{kernel_download_urls}}; do
    curl --silent -o kernel.tar -SL "$url"
    tar -xf kernel.tar
    rm -f kernel.tar
done

sourcedir=$(find /tmp/kernel-download -mindepth 1 -maxdepth 1 -type d -name 'linux-*' | head -n 1)
ln -sfn "$sourcedir" {{kernel_dir}}
cd {{kernel_dir}}
make olddefconfig LOCALVERSION={{kernel_local_version}}
make modules_prepare LOCALVERSION={{kernel_local_version}}
"#,
};

/// Build, strip, and install the kernel module.
pub const MODULE: Section = Section {
    name: "module",
    body: r"# Build the kernel module
cd {{driver_build_dir}}
make CC=/usr/bin/gcc-{{gcc_version}} KERNELDIR={{kernel_dir}}
mv {{module_file}} {{module_output_path}}
strip -g {{module_output_path}}
modinfo {{module_output_path}}
",
};

/// Build the eBPF probe.
///
/// The object stays at `bpf/probe.o` under the staging directory and is
/// also copied to the configured probe path.
pub const PROBE: Section = Section {
    name: "probe",
    body: r"# Build the eBPF probe
cd {{driver_build_dir}}/bpf
make LLC=/usr/bin/llc-{{llvm_version}} CLANG=/usr/bin/clang-{{llvm_version}} CC=/usr/bin/gcc-{{gcc_version}} KERNELDIR={{kernel_dir}}
ls -l probe.o
cp probe.o {{probe_output_path}}
",
};
